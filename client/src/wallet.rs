use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use tokio::time::Instant;
use tonwallet_core::cell::ArcCell;
use tonwallet_core::message::{
    build_comment_cell, build_encrypted_comment_cell, ExternalMessage, StateInit, TransferMessage,
};
use tonwallet_core::mnemonic::KeyPair;
use tonwallet_core::types::TonHash;
use tonwallet_core::wallet::{BodyParams, TonWallet, WalletSpec, WalletVersion};
use tonwallet_core::TonAddress;

use crate::api::{AccountState, BlockId, StackValue, TonApi, TonApiError, TxRecord};
use crate::config::WalletConfig;
use crate::confirmation::{ConfirmationSession, MessageFingerprint};
use crate::error::TonWalletError;

const FIND_TX_PAGE_SIZE: usize = 15;

/// The wallet engine: an offline identity bound to a ledger-access
/// capability. One instance reasons about one confirmation window at a
/// time; concurrent sends from the same identity race on the account
/// sequence and need external serialization.
pub struct Wallet {
    api: Arc<dyn TonApi>,
    inner: TonWallet,
    config: WalletConfig,
}

impl Wallet {
    pub fn from_key_pair(
        api: Arc<dyn TonApi>,
        key_pair: &KeyPair,
        version: WalletVersion,
    ) -> Result<Wallet, TonWalletError> {
        Self::with_config(api, key_pair, version, WalletConfig::default())
    }

    /// Construction resolves the version's body builder once; versions
    /// without one (e.g. lockup) fail fast here.
    pub fn with_config(
        api: Arc<dyn TonApi>,
        key_pair: &KeyPair,
        version: WalletVersion,
        config: WalletConfig,
    ) -> Result<Wallet, TonWalletError> {
        let inner = TonWallet::derive_default(version, key_pair)?;
        Ok(Wallet { api, inner, config })
    }

    /// Builds the identity from a 64-byte tweetnacl secret key.
    pub fn from_secret_key(
        api: Arc<dyn TonApi>,
        secret_key: &[u8],
        version: WalletVersion,
    ) -> Result<Wallet, TonWalletError> {
        let key_pair = KeyPair::from_secret_key(secret_key)?;
        Self::from_key_pair(api, &key_pair, version)
    }

    /// Sibling wallet under the same key and version with another
    /// subwallet id, sharing the api handle.
    pub fn subwallet(&self, wallet_id: i32) -> Result<Wallet, TonWalletError> {
        Ok(Wallet {
            api: self.api.clone(),
            inner: self.inner.subwallet(wallet_id)?,
            config: self.config.clone(),
        })
    }

    pub fn address(&self) -> &TonAddress {
        &self.inner.address
    }

    pub fn version(&self) -> WalletVersion {
        self.inner.version
    }

    pub fn wallet_id(&self) -> i32 {
        self.inner.wallet_id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.inner.key_pair
    }

    pub fn identity(&self) -> &TonWallet {
        &self.inner
    }

    /// Balance at the current chain head; zero for inactive accounts.
    pub async fn balance(&self) -> Result<BigUint, TonWalletError> {
        let block = self.api.masterchain_info().await?;
        let account = self.api.account_state(&block, self.address()).await?;
        if !account.is_active() {
            return Ok(BigUint::zero());
        }
        Ok(account.balance)
    }

    /// Current stored sequence number, via the contract's getter.
    pub async fn seqno(&self, block: &BlockId) -> Result<u32, TonWalletError> {
        let stack = self
            .api
            .run_get_method(block, self.address(), "seqno")
            .await?;
        match stack.as_slice() {
            [StackValue::Int(seqno)] => seqno.to_u32().ok_or_else(|| {
                TonApiError::Transport(format!("seqno out of range: {seqno}")).into()
            }),
            other => Err(TonApiError::Transport(format!(
                "unexpected seqno result: {} stack entries",
                other.len()
            ))
            .into()),
        }
    }

    /// Public key stored in an arbitrary wallet contract, used to address
    /// encrypted comments to it.
    pub async fn get_public_key_of(
        &self,
        block: &BlockId,
        address: &TonAddress,
    ) -> Result<TonHash, TonWalletError> {
        let stack = match self
            .api
            .run_get_method(block, address, "get_public_key")
            .await
        {
            Ok(stack) => stack,
            Err(TonApiError::GetMethodFailed { .. }) => {
                return Err(TonWalletError::MissingPublicKey(address.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let key_int = match stack.as_slice() {
            [StackValue::Int(key)] => key,
            _ => return Err(TonWalletError::MissingPublicKey(address.clone())),
        };
        let bytes = key_int.to_biguint().map(|k| k.to_bytes_be());
        match bytes {
            Some(bytes) if bytes.len() <= 32 => {
                let mut key: TonHash = [0; 32];
                key[32 - bytes.len()..].copy_from_slice(&bytes);
                Ok(key)
            }
            _ => Err(TonWalletError::MissingPublicKey(address.clone())),
        }
    }

    /// Plain transfer intent; a non-empty comment becomes the text body.
    pub fn build_transfer(
        &self,
        to: &TonAddress,
        amount: &BigUint,
        bounce: bool,
        comment: &str,
    ) -> Result<TransferMessage, TonWalletError> {
        let mut transfer = TransferMessage::new(to, amount).with_bounce(bounce);
        if !comment.is_empty() {
            transfer = transfer.with_body(build_comment_cell(comment)?);
        }
        Ok(transfer)
    }

    /// Transfer with an end-to-end encrypted comment. Fetches the
    /// destination wallet's public key from the ledger first; fails when
    /// the destination exposes none.
    pub async fn build_transfer_encrypted(
        &self,
        to: &TonAddress,
        amount: &BigUint,
        bounce: bool,
        comment: &str,
    ) -> Result<TransferMessage, TonWalletError> {
        let mut transfer = TransferMessage::new(to, amount).with_bounce(bounce);
        if !comment.is_empty() {
            let block = self.api.masterchain_info().await?;
            let their_key = self.get_public_key_of(&block, to).await?;
            let body = build_encrypted_comment_cell(
                comment,
                self.address(),
                &self.inner.key_pair,
                &their_key,
            )?;
            transfer = transfer.with_body(body);
        }
        Ok(transfer)
    }

    /// Builds the signed envelope against the current chain state,
    /// attaching the self-deployment payload when the account is not
    /// active yet. All I/O happens here, assembly itself is pure.
    pub async fn build_external_message(
        &self,
        transfers: &[TransferMessage],
    ) -> Result<ExternalMessage, TonWalletError> {
        let block = self.api.masterchain_info().await?;
        let account = self.api.account_state(&block, self.address()).await?;
        self.assemble(&block, &account, transfers).await
    }

    /// Fully offline assembly for pre-signed workflows; the caller supplies
    /// the sequence number. Sequence-number wallets only.
    pub fn build_external_message_offline(
        &self,
        seqno: u32,
        deploying: bool,
        transfers: &[TransferMessage],
    ) -> Result<ExternalMessage, TonWalletError> {
        match self.inner.spec() {
            WalletSpec::Regular { .. } => {
                let params = BodyParams::Seqno {
                    seqno,
                    valid_until: self.expire_at(),
                };
                Ok(self.inner.create_external_message(&params, transfers, deploying)?)
            }
            WalletSpec::Highload => {
                Err(TonWalletError::UnsupportedVersion(self.inner.version))
            }
        }
    }

    /// Submits one transfer; returns the signed body hash for later lookup.
    pub async fn send(&self, transfer: TransferMessage) -> Result<TonHash, TonWalletError> {
        self.send_many(&[transfer]).await
    }

    pub async fn send_many(
        &self,
        transfers: &[TransferMessage],
    ) -> Result<TonHash, TonWalletError> {
        let (body_hash, _) = self.submit(transfers, None).await?;
        Ok(body_hash)
    }

    /// Submits and waits for on-ledger confirmation with the default
    /// deadline, returning the confirming transaction and its block.
    pub async fn send_wait_transaction(
        &self,
        transfer: TransferMessage,
    ) -> Result<(TxRecord, BlockId), TonWalletError> {
        self.send_many_wait_transaction(&[transfer]).await
    }

    pub async fn send_many_wait_transaction(
        &self,
        transfers: &[TransferMessage],
    ) -> Result<(TxRecord, BlockId), TonWalletError> {
        let deadline = Instant::now() + self.config.confirmation_timeout;
        self.send_many_wait_until(transfers, deadline).await
    }

    /// Same as [`send_many_wait_transaction`] with a caller-supplied
    /// deadline.
    ///
    /// [`send_many_wait_transaction`]: Wallet::send_many_wait_transaction
    pub async fn send_many_wait_until(
        &self,
        transfers: &[TransferMessage],
        deadline: Instant,
    ) -> Result<(TxRecord, BlockId), TonWalletError> {
        let (_, confirmed) = self.submit(transfers, Some(deadline)).await?;
        confirmed.ok_or(TonWalletError::TxNotConfirmed)
    }

    /// Safe transfer: bounces back on destination-side errors. Cannot
    /// target a not-yet-initialized account.
    pub async fn transfer(
        &self,
        to: &TonAddress,
        amount: &BigUint,
        comment: &str,
    ) -> Result<TonHash, TonWalletError> {
        self.send(self.build_transfer(to, amount, true, comment)?)
            .await
    }

    /// Non-bouncing transfer, usable to fund not-yet-initialized accounts.
    pub async fn transfer_no_bounce(
        &self,
        to: &TonAddress,
        amount: &BigUint,
        comment: &str,
    ) -> Result<TonHash, TonWalletError> {
        self.send(self.build_transfer(to, amount, false, comment)?)
            .await
    }

    pub async fn transfer_with_encrypted_comment(
        &self,
        to: &TonAddress,
        amount: &BigUint,
        comment: &str,
    ) -> Result<TonHash, TonWalletError> {
        let transfer = self.build_transfer_encrypted(to, amount, true, comment).await?;
        self.send(transfer).await
    }

    /// Deploys an arbitrary contract: derives its address from the
    /// state-init hash, funds it with a non-bouncing transfer carrying the
    /// deployment payload and waits for the confirming transaction.
    pub async fn deploy_contract(
        &self,
        amount: &BigUint,
        body: Option<ArcCell>,
        code: ArcCell,
        data: ArcCell,
    ) -> Result<(TonAddress, TxRecord, BlockId), TonWalletError> {
        let state_init = StateInit::new(code, data);
        let address = state_init.derive_address(0)?;
        let mut transfer = TransferMessage::new(&address, amount)
            .with_bounce(false)
            .with_state_init(state_init);
        if let Some(body) = body {
            transfer = transfer.with_body_ref(&body);
        }
        let (tx, block) = self.send_wait_transaction(transfer).await?;
        Ok((address, tx, block))
    }

    /// Point lookup: scans recent history (newest first) for a transaction
    /// whose incoming message body hash equals `msg_hash`. The scan depth
    /// is bounded; pruned history maps to [`TonWalletError::ArchiveRequired`].
    pub async fn find_transaction_by_in_msg_hash(
        &self,
        msg_hash: &TonHash,
        max_tx_to_scan: Option<usize>,
    ) -> Result<TxRecord, TonWalletError> {
        let limit = max_tx_to_scan.unwrap_or(self.config.tx_scan_limit);
        let block = self.api.masterchain_info().await?;
        let account = self.api.account_state(&block, self.address()).await?;
        if !account.is_active() {
            // no transaction was ever made from this account
            return Err(TonWalletError::TxNotFound);
        }

        let mut cursor = account.last_tx;
        let mut scanned = 0usize;
        loop {
            if cursor.is_genesis() {
                return Err(TonWalletError::TxNotFound);
            }
            let page = match self
                .api
                .list_transactions(self.address(), &cursor, FIND_TX_PAGE_SIZE)
                .await
            {
                Err(TonApiError::HistoryPruned(_)) => {
                    return Err(TonWalletError::ArchiveRequired)
                }
                other => other?,
            };
            if page.is_empty() {
                return Err(TonWalletError::TxNotFound);
            }
            for tx in &page {
                if tx
                    .in_msg
                    .as_ref()
                    .is_some_and(|msg| msg.body_hash == *msg_hash)
                {
                    return Ok(tx.clone());
                }
            }
            scanned += page.len();
            if scanned >= limit {
                debug!("scan limit of {limit} transactions reached without a match");
                return Err(TonWalletError::TxNotFound);
            }
            cursor = page[page.len() - 1].prev.clone();
        }
    }

    async fn assemble(
        &self,
        block: &BlockId,
        account: &AccountState,
        transfers: &[TransferMessage],
    ) -> Result<ExternalMessage, TonWalletError> {
        let deploying = !account.is_active();
        let params = match self.inner.spec() {
            WalletSpec::Regular { .. } => {
                let seqno = if deploying {
                    0
                } else {
                    self.seqno(block).await?
                };
                BodyParams::Seqno {
                    seqno,
                    valid_until: self.expire_at(),
                }
            }
            WalletSpec::Highload => BodyParams::Query {
                query_id: self.next_query_id(),
            },
        };
        Ok(self.inner.create_external_message(&params, transfers, deploying)?)
    }

    async fn submit(
        &self,
        transfers: &[TransferMessage],
        deadline: Option<Instant>,
    ) -> Result<(TonHash, Option<(TxRecord, BlockId)>), TonWalletError> {
        let block = self.api.masterchain_info().await?;
        let account = self.api.account_state(&block, self.address()).await?;
        let ext = self.assemble(&block, &account, transfers).await?;
        let boc = ext.to_boc()?;
        let body_hash = ext.body_hash();

        // initial submission failures surface, only retries are silent
        self.api.send_external_message(&boc).await?;

        let confirmed = match deadline {
            None => None,
            Some(deadline) => {
                let session = ConfirmationSession::new(
                    self.address().clone(),
                    MessageFingerprint::of(&ext),
                    boc,
                    block,
                    account.last_tx.clone(),
                    deadline,
                );
                Some(session.wait(self.api.as_ref()).await?)
            }
        };
        Ok((body_hash, confirmed))
    }

    fn expire_at(&self) -> u32 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        (now + self.config.message_ttl.as_secs()) as u32
    }

    /// Highload replay protection: expiry timestamp in the upper half,
    /// random salt in the lower.
    fn next_query_id(&self) -> u64 {
        ((self.expire_at() as u64) << 32) | rand::random::<u32>() as u64
    }
}
