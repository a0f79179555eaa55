use thiserror::Error;
use tonwallet_core::cell::TonCellError;
use tonwallet_core::message::TonMessageError;
use tonwallet_core::mnemonic::MnemonicError;
use tonwallet_core::wallet::{WalletError, WalletVersion};
use tonwallet_core::TonAddress;

#[derive(Error, Debug)]
pub enum TonWalletError {
    #[error("Wallet version {0:?} is not supported")]
    UnsupportedVersion(WalletVersion),

    /// The deadline elapsed without a matching transaction. The message
    /// was submitted and may still be confirmed later.
    #[error("Transaction was not confirmed in the given deadline, but it may still be confirmed later")]
    TxNotConfirmed,

    /// The bounded scan completed without finding the transaction.
    #[error("Requested transaction is not found")]
    TxNotFound,

    /// Like [`TonWalletError::TxNotFound`], but deeper history exists and
    /// requires an archive-capable peer.
    #[error("Requested transaction is not found in available history, an archive node is needed")]
    ArchiveRequired,

    #[error("Destination {0} has no retrievable public key")]
    MissingPublicKey(TonAddress),

    #[error("Api error ({0})")]
    Api(#[from] crate::api::TonApiError),

    #[error("Wallet error ({0})")]
    Wallet(WalletError),

    #[error("Message error ({0})")]
    Message(#[from] TonMessageError),

    #[error("Cell error ({0})")]
    Cell(#[from] TonCellError),

    #[error("Mnemonic error ({0})")]
    Mnemonic(#[from] MnemonicError),
}

impl From<WalletError> for TonWalletError {
    fn from(value: WalletError) -> Self {
        match value {
            WalletError::UnsupportedVersion(version) => {
                TonWalletError::UnsupportedVersion(version)
            }
            other => TonWalletError::Wallet(other),
        }
    }
}
