use thiserror::Error;

#[derive(Error, Debug)]
pub enum TonCryptoError {
    #[error("Invalid key material ({0})")]
    InvalidKey(String),
}
