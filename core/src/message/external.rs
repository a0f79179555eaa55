use num_bigint::BigUint;
use num_traits::Zero;

use crate::cell::{ArcCell, BagOfCells, Cell, CellBuilder, TonCellError};
use crate::message::StateInit;
use crate::types::TonHash;
use crate::TonAddress;

/// The envelope submitted from outside the ledger: destination wallet,
/// optional self-deployment payload and the signed, versioned body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalMessage {
    pub dest: TonAddress,
    pub state_init: Option<StateInit>,
    pub body: ArcCell,
}

impl ExternalMessage {
    pub fn new(dest: &TonAddress, state_init: Option<StateInit>, body: ArcCell) -> Self {
        ExternalMessage {
            dest: dest.clone(),
            state_init,
            body,
        }
    }

    /// Hash of the signed body, the fingerprint confirmation scans match on.
    pub fn body_hash(&self) -> TonHash {
        self.body.cell_hash()
    }

    /// Code and data hashes of the deployment payload, when present.
    pub fn state_init_hashes(&self) -> Option<(TonHash, TonHash)> {
        self.state_init
            .as_ref()
            .map(|s| (s.code_hash(), s.data_hash()))
    }

    /// Serializes the `ext_in_msg_info` layout.
    pub fn to_cell(&self) -> Result<Cell, TonCellError> {
        let mut builder = CellBuilder::new();
        builder
            .store_u8(2, 0b10)? // ext_in_msg_info tag
            .store_address(&TonAddress::NULL)? // src
            .store_address(&self.dest)?
            .store_coins(&BigUint::zero())?; // import_fee
        match &self.state_init {
            Some(state_init) => {
                builder.store_bit(true)?;
                builder.store_bit(true)?; // state_init in ref
                builder.store_child(state_init.to_cell()?)?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        builder.store_bit(true)?; // body in ref
        builder.store_reference(&self.body)?;
        builder.build()
    }

    /// Serialized form for submission over the wire.
    pub fn to_boc(&self) -> Result<Vec<u8>, TonCellError> {
        BagOfCells::from_root(self.to_cell()?).serialize(true)
    }
}
