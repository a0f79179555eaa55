mod error;
mod shared_key;

pub use error::*;
pub use shared_key::*;
