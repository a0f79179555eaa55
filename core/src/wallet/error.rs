use thiserror::Error;

use crate::cell::TonCellError;
use crate::wallet::WalletVersion;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet version {0:?} is not supported")]
    UnsupportedVersion(WalletVersion),

    #[error("Unsupported internal message count: {count} (between 1 and {max})")]
    TooManyMessages { count: usize, max: usize },

    #[error("Body parameters do not match the {0:?} builder")]
    SpecMismatch(WalletVersion),

    #[error("Invalid public key length: {0} (expected 32)")]
    InvalidPublicKey(usize),

    #[error("Signature error ({0})")]
    SignatureError(String),

    #[error("TonCellError ({0})")]
    CellError(#[from] TonCellError),
}
