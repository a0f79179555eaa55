mod comment;
mod error;
mod external;
mod state_init;
mod transfer;

pub use comment::*;
pub use error::*;
pub use external::*;
pub use state_init::*;
pub use transfer::*;

/// Send-mode flags of an outgoing internal message.
pub mod mode {
    /// Sender pays the forwarding fees separately from the transferred value.
    pub const PAY_FEES_SEPARATELY: u8 = 1;
    /// Errors during the action phase are ignored instead of bouncing.
    pub const IGNORE_ERRORS: u8 = 2;
    /// Destroy the sending account if its balance reaches zero.
    pub const DESTROY_IF_ZERO: u8 = 32;
    /// Carry the whole remaining balance instead of a fixed value.
    pub const CARRY_ALL_BALANCE: u8 = 128;
}

/// Mode used by the transfer builders: fees paid by sender, errors ignored.
pub const DEFAULT_TRANSFER_MODE: u8 = mode::PAY_FEES_SEPARATELY | mode::IGNORE_ERRORS;
