use async_trait::async_trait;
use num_bigint::{BigInt, BigUint};
use thiserror::Error;
use tonwallet_core::cell::ArcCell;
use tonwallet_core::types::TonHash;
use tonwallet_core::{TonAddress, TonTxId};

/// Chain-head block descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockId {
    pub workchain: i32,
    pub shard: u64,
    pub seqno: u32,
    pub root_hash: TonHash,
    pub file_hash: TonHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Uninitialized,
    Frozen,
    Active,
}

/// Account snapshot at a specific block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub status: AccountStatus,
    pub balance: BigUint,
    /// Reference of the most recent transaction; genesis sentinel when the
    /// account has none.
    pub last_tx: TonTxId,
}

impl AccountState {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    ExternalIn,
    ExternalOut,
    Internal,
}

/// Metadata of a transaction's incoming message, enough to match a
/// submitted envelope without refetching bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMsgInfo {
    pub kind: MsgKind,
    pub body_hash: TonHash,
    pub state_init_code_hash: Option<TonHash>,
    pub state_init_data_hash: Option<TonHash>,
}

/// One listed transaction: its own reference, the previous-transaction
/// pointer forming the per-account chain, and the incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub id: TonTxId,
    pub prev: TonTxId,
    pub in_msg: Option<InboundMsgInfo>,
}

/// Minimal typed get-method stack value.
#[derive(Debug, Clone, PartialEq)]
pub enum StackValue {
    Int(BigInt),
    Cell(ArcCell),
}

#[derive(Error, Debug)]
pub enum TonApiError {
    #[error("Transport error ({0})")]
    Transport(String),

    /// The queried span of account history is pruned on this peer; an
    /// archive-capable peer is required to go deeper.
    #[error("History is pruned ({0})")]
    HistoryPruned(String),

    #[error("Get method {method} failed with exit code {exit_code}")]
    GetMethodFailed { method: String, exit_code: i32 },
}

/// Ledger-access capability consumed by the wallet engine. Implementations
/// wrap a concrete transport; the engine never talks to peers directly.
#[async_trait]
pub trait TonApi: Send + Sync {
    /// Current chain head.
    async fn masterchain_info(&self) -> Result<BlockId, TonApiError>;

    /// Head block with seqno at least `seqno`; implementations block for
    /// the natural block cadence.
    async fn wait_for_block(&self, seqno: u32) -> Result<BlockId, TonApiError>;

    async fn account_state(
        &self,
        block: &BlockId,
        address: &TonAddress,
    ) -> Result<AccountState, TonApiError>;

    /// Submits a serialized external message. Idempotent: the ledger
    /// deduplicates by content, duplicate submission is safe.
    async fn send_external_message(&self, boc: &[u8]) -> Result<(), TonApiError>;

    /// Up to `limit` transactions ending at the `from` cursor, newest
    /// first. Each record carries its previous-transaction pointer so the
    /// caller can page toward older history.
    async fn list_transactions(
        &self,
        address: &TonAddress,
        from: &TonTxId,
        limit: usize,
    ) -> Result<Vec<TxRecord>, TonApiError>;

    async fn run_get_method(
        &self,
        block: &BlockId,
        address: &TonAddress,
        method: &str,
    ) -> Result<Vec<StackValue>, TonApiError>;
}
