use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use num_bigint::BigUint;
use tonwallet_client::{
    AccountState, AccountStatus, BlockId, InboundMsgInfo, MsgKind, StackValue, TonApi,
    TonApiError, TxRecord,
};
use tonwallet_core::cell::BagOfCells;
use tonwallet_core::types::TonHash;
use tonwallet_core::{TonAddress, TonTxId};

pub fn block(seqno: u32) -> BlockId {
    BlockId {
        workchain: -1,
        shard: 0x8000000000000000,
        seqno,
        root_hash: [0; 32],
        file_hash: [0; 32],
    }
}

pub fn hash(tag: u64) -> TonHash {
    let mut hash: TonHash = [0; 32];
    hash[0..8].copy_from_slice(&tag.to_be_bytes());
    hash
}

pub fn tx_id(lt: u64) -> TonTxId {
    TonTxId::new(lt, hash(lt))
}

pub fn active_account(last_lt: u64) -> AccountState {
    AccountState {
        status: AccountStatus::Active,
        balance: BigUint::from(5_000_000_000u64),
        last_tx: tx_id(last_lt),
    }
}

pub fn uninit_account() -> AccountState {
    AccountState {
        status: AccountStatus::Uninitialized,
        balance: BigUint::from(0u8),
        last_tx: TonTxId::default(),
    }
}

/// Unrelated on-ledger activity: an internal incoming message.
pub fn unrelated_tx(lt: u64, prev_lt: u64) -> TxRecord {
    TxRecord {
        id: tx_id(lt),
        prev: tx_id(prev_lt),
        in_msg: Some(InboundMsgInfo {
            kind: MsgKind::Internal,
            body_hash: hash(0xbeef_0000 + lt),
            state_init_code_hash: None,
            state_init_data_hash: None,
        }),
    }
}

/// A confirmation candidate: external-in message with the given body hash.
pub fn ext_in_tx(lt: u64, prev_lt: u64, body_hash: TonHash) -> TxRecord {
    TxRecord {
        id: tx_id(lt),
        prev: tx_id(prev_lt),
        in_msg: Some(InboundMsgInfo {
            kind: MsgKind::ExternalIn,
            body_hash,
            state_init_code_hash: None,
            state_init_data_hash: None,
        }),
    }
}

#[derive(Default)]
pub struct MockScript {
    pub head_seqno: u32,
    /// Account snapshots returned in order; the last one repeats.
    pub accounts: VecDeque<AccountState>,
    /// Transaction pages keyed by the cursor's logical time.
    pub pages: HashMap<u64, Vec<TxRecord>>,
    /// Number of empty pages served before `pages` kicks in.
    pub empty_pages: usize,
    /// Serve `HistoryPruned` from transaction listing.
    pub history_pruned: bool,
    /// Get-method results by method name.
    pub get_methods: HashMap<String, Vec<StackValue>>,
    /// When set, a submitted envelope immediately "lands": the account
    /// jumps to `lt`, and that transaction carries the submitted body hash.
    pub confirm_submission_at: Option<(u64, u64)>, // (lt, prev_lt)
    pub sent: Vec<Vec<u8>>,
    pub captured_body_hash: Option<TonHash>,
}

pub struct MockApi {
    pub state: Mutex<MockScript>,
}

impl MockApi {
    pub fn new(script: MockScript) -> MockApi {
        MockApi {
            state: Mutex::new(script),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    pub fn sent_boc(&self, index: usize) -> Vec<u8> {
        self.state.lock().unwrap().sent[index].clone()
    }
}

#[async_trait]
impl TonApi for MockApi {
    async fn masterchain_info(&self) -> Result<BlockId, TonApiError> {
        let state = self.state.lock().unwrap();
        Ok(block(state.head_seqno))
    }

    async fn wait_for_block(&self, seqno: u32) -> Result<BlockId, TonApiError> {
        let mut state = self.state.lock().unwrap();
        state.head_seqno = state.head_seqno.max(seqno);
        Ok(block(state.head_seqno))
    }

    async fn account_state(
        &self,
        _block: &BlockId,
        _address: &TonAddress,
    ) -> Result<AccountState, TonApiError> {
        let mut state = self.state.lock().unwrap();
        if let (Some((lt, _)), Some(_)) = (state.confirm_submission_at, &state.captured_body_hash)
        {
            return Ok(active_account(lt));
        }
        match state.accounts.len() {
            0 => Err(TonApiError::Transport("no scripted account state".to_string())),
            1 => Ok(state.accounts[0].clone()),
            _ => Ok(state.accounts.pop_front().expect("non-empty")),
        }
    }

    async fn send_external_message(&self, boc: &[u8]) -> Result<(), TonApiError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push(boc.to_vec());
        if state.confirm_submission_at.is_some() {
            let root = BagOfCells::parse(boc)
                .and_then(BagOfCells::single_root)
                .map_err(|e| TonApiError::Transport(e.to_string()))?;
            let body = root
                .references()
                .last()
                .ok_or_else(|| TonApiError::Transport("envelope without body".to_string()))?;
            state.captured_body_hash = Some(body.cell_hash());
        }
        Ok(())
    }

    async fn list_transactions(
        &self,
        _address: &TonAddress,
        from: &TonTxId,
        limit: usize,
    ) -> Result<Vec<TxRecord>, TonApiError> {
        let mut state = self.state.lock().unwrap();
        if state.history_pruned {
            return Err(TonApiError::HistoryPruned(
                "lt not in db".to_string(),
            ));
        }
        if state.empty_pages > 0 {
            state.empty_pages -= 1;
            return Ok(Vec::new());
        }
        if let (Some((lt, prev_lt)), Some(body_hash)) =
            (state.confirm_submission_at, state.captured_body_hash)
        {
            if from.lt == lt {
                return Ok(vec![ext_in_tx(lt, prev_lt, body_hash)]);
            }
        }
        let page = state.pages.get(&from.lt).cloned().unwrap_or_default();
        Ok(page.into_iter().take(limit).collect())
    }

    async fn run_get_method(
        &self,
        _block: &BlockId,
        _address: &TonAddress,
        method: &str,
    ) -> Result<Vec<StackValue>, TonApiError> {
        let state = self.state.lock().unwrap();
        state
            .get_methods
            .get(method)
            .cloned()
            .ok_or_else(|| TonApiError::GetMethodFailed {
                method: method.to_string(),
                exit_code: 11,
            })
    }
}
