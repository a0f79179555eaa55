use hmac::digest::InvalidLength;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MnemonicError {
    #[error("Unexpected word count: {0} (expected 24)")]
    UnexpectedWordCount(usize),

    #[error("Word '{0}' is not in the wordlist")]
    InvalidWord(String),

    #[error("Invalid mnemonic basis check, first byte: {0}")]
    InvalidFirstByte(u8),

    #[error("Invalid passwordless mnemonic basis check, first byte: {0}")]
    InvalidPasswordlessMnemonicFirstByte(u8),

    #[error("Invalid secret key length: {0} (expected 64)")]
    InvalidSecretKeyLength(usize),

    #[error("Invalid HMAC key length")]
    HmacKeyError(#[from] InvalidLength),
}
