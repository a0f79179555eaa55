use log::debug;
use tokio::time::Instant;
use tonwallet_core::message::ExternalMessage;
use tonwallet_core::types::TonHash;
use tonwallet_core::{TonAddress, TonTxId};

use crate::api::{BlockId, InboundMsgInfo, MsgKind, TonApi, TxRecord};
use crate::error::TonWalletError;

/// Size of one backward-scan page. Small on purpose: the scan usually
/// terminates within a page, and the reference rule below handles the case
/// where it does not.
pub(crate) const SCAN_PAGE_SIZE: usize = 5;

/// Identifying hashes of a submitted envelope: the signed body and, for a
/// deploying send, the state-init code/data pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFingerprint {
    pub body_hash: TonHash,
    pub state_init_hashes: Option<(TonHash, TonHash)>,
}

impl MessageFingerprint {
    pub fn of(ext: &ExternalMessage) -> MessageFingerprint {
        MessageFingerprint {
            body_hash: ext.body_hash(),
            state_init_hashes: ext.state_init_hashes(),
        }
    }

    /// A transaction confirms the envelope when its incoming message is
    /// external-in, carries the same deployment payload (if any was sent)
    /// and the same body hash.
    pub fn matches(&self, msg: &InboundMsgInfo) -> bool {
        if msg.kind != MsgKind::ExternalIn {
            return false;
        }
        if let Some((code_hash, data_hash)) = &self.state_init_hashes {
            if msg.state_init_code_hash.as_ref() != Some(code_hash) {
                return false;
            }
            if msg.state_init_data_hash.as_ref() != Some(data_hash) {
                return false;
            }
        }
        msg.body_hash == self.body_hash
    }
}

/// Outcome of one polling iteration.
#[derive(Debug)]
pub enum PollOutcome {
    Confirmed(TxRecord, BlockId),
    Pending,
}

/// One send-and-wait confirmation window.
///
/// The session owns the scan cursor state explicitly: `block` is the last
/// inspected chain head and `reference` the account's last-transaction id
/// the envelope was submitted against. Each [`poll_once`] advances them and
/// either confirms or stays pending; [`wait`] loops until the deadline.
///
/// [`poll_once`]: ConfirmationSession::poll_once
/// [`wait`]: ConfirmationSession::wait
#[derive(Debug)]
pub struct ConfirmationSession {
    address: TonAddress,
    fingerprint: MessageFingerprint,
    boc: Vec<u8>,
    block: BlockId,
    reference: TonTxId,
    deadline: Instant,
}

impl ConfirmationSession {
    pub fn new(
        address: TonAddress,
        fingerprint: MessageFingerprint,
        boc: Vec<u8>,
        block: BlockId,
        reference: TonTxId,
        deadline: Instant,
    ) -> ConfirmationSession {
        ConfirmationSession {
            address,
            fingerprint,
            boc,
            block,
            reference,
            deadline,
        }
    }

    pub fn reference(&self) -> &TonTxId {
        &self.reference
    }

    /// Polls until confirmed or the deadline elapses. The deadline is the
    /// only exit besides confirmation: transient errors inside the loop are
    /// retried, never surfaced.
    pub async fn wait(mut self, api: &dyn TonApi) -> Result<(TxRecord, BlockId), TonWalletError> {
        while Instant::now() < self.deadline {
            if let PollOutcome::Confirmed(tx, block) = self.poll_once(api).await {
                return Ok((tx, block));
            }
        }
        Err(TonWalletError::TxNotConfirmed)
    }

    /// One iteration: fetch the next block and account state, resubmit when
    /// nothing landed, otherwise scan the new transaction window.
    pub async fn poll_once(&mut self, api: &dyn TonApi) -> PollOutcome {
        let block = match api.wait_for_block(self.block.seqno + 1).await {
            Ok(block) => block,
            Err(e) => {
                debug!("block fetch failed, retrying: {e}");
                return PollOutcome::Pending;
            }
        };
        let account = match api.account_state(&block, &self.address).await {
            Ok(account) => account,
            Err(e) => {
                debug!("account fetch failed, retrying: {e}");
                return PollOutcome::Pending;
            }
        };
        self.block = block;

        if account.last_tx.lt == self.reference.lt {
            // nothing landed yet, the peer may have lost the message
            if let Err(e) = api.send_external_message(&self.boc).await {
                debug!("resubmission failed, retrying: {e}");
            }
            return PollOutcome::Pending;
        }

        let outcome = self.scan_new_window(api, account.last_tx.clone()).await;
        // the window up to the old reference has been inspected, poll from
        // the new state next iteration
        self.reference = account.last_tx;
        outcome
    }

    /// Backward scan from `newest` toward the reference transaction.
    ///
    /// The scan must not stop before the page chain reaches the reference:
    /// unrelated transactions interleaved with ours can push the target
    /// below any single page boundary. Conversely, once a page links back
    /// to the reference the whole window has been seen.
    async fn scan_new_window(&mut self, api: &dyn TonApi, newest: TonTxId) -> PollOutcome {
        let mut cursor = newest;
        let mut saw_reference = false;
        while Instant::now() < self.deadline {
            let page = match api
                .list_transactions(&self.address, &cursor, SCAN_PAGE_SIZE)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    debug!("transaction listing failed, retrying: {e}");
                    continue;
                }
            };
            if page.is_empty() {
                // transient peer condition, not a window boundary
                continue;
            }

            for tx in &page {
                if !saw_reference && tx.prev == self.reference {
                    saw_reference = true;
                }
                if let Some(msg) = &tx.in_msg {
                    if self.fingerprint.matches(msg) {
                        return PollOutcome::Confirmed(tx.clone(), self.block.clone());
                    }
                }
            }

            if saw_reference {
                break;
            }
            // page is newest-first, its tail points to the older remainder
            cursor = page[page.len() - 1].prev.clone();
            if cursor.is_genesis() {
                // account history ends before the reference, window is done
                break;
            }
        }
        PollOutcome::Pending
    }
}
