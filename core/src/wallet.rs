mod error;
mod ton_wallet;
mod version;
mod versioned;

pub use error::*;
pub use ton_wallet::*;
pub use version::*;
pub use versioned::*;

/// Default subwallet id shared by every mainstream wallet deployment.
pub const DEFAULT_WALLET_ID: i32 = 0x29a9a317;
