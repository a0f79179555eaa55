use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::TonHash;
use crate::types::ZERO_HASH;

/// Per-account transaction reference: logical time plus transaction hash.
///
/// `lt == 0` is the genesis sentinel, meaning "no older transactions".
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Default)]
pub struct TonTxId {
    pub lt: u64,
    pub hash: TonHash,
}

pub const NULL_TX_ID: TonTxId = TonTxId {
    lt: 0,
    hash: ZERO_HASH,
};

impl TonTxId {
    pub fn new(lt: u64, hash: TonHash) -> TonTxId {
        TonTxId { lt, hash }
    }

    pub fn is_genesis(&self) -> bool {
        self.lt == 0
    }

    pub fn to_formatted_string(&self) -> String {
        format!("{}:{}", self.lt, hex::encode(self.hash))
    }
}

impl Display for TonTxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_formatted_string().as_str())
    }
}

impl Debug for TonTxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_formatted_string().as_str())
    }
}
