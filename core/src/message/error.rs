use thiserror::Error;

use crate::cell::TonCellError;
use crate::crypto::TonCryptoError;

#[derive(Error, Debug)]
pub enum TonMessageError {
    #[error("NaCl cryptographic error ({0})")]
    NaclCryptographicError(String),

    #[error("Malformed comment ({0})")]
    MalformedComment(String),

    #[error("TonCryptoError ({0})")]
    CryptoError(#[from] TonCryptoError),

    #[error("TonCellError ({0})")]
    TonCellError(#[from] TonCellError),
}
