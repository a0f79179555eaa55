use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::cell::{ArcCell, Cell, CellBuilder, TonCellError};
use crate::message::{StateInit, DEFAULT_TRANSFER_MODE};
use crate::TonAddress;

/// A single transfer intent: one internal message plus its send mode.
///
/// Immutable once built; the version-specific wallet body carries up to a
/// builder-defined number of these.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferMessage {
    pub mode: u8,
    pub dest: TonAddress,
    pub value: BigUint,
    pub bounce: bool,
    pub body: Option<ArcCell>,
    pub state_init: Option<StateInit>,
}

impl TransferMessage {
    pub fn new(dest: &TonAddress, value: &BigUint) -> Self {
        TransferMessage {
            mode: DEFAULT_TRANSFER_MODE,
            dest: dest.clone(),
            value: value.clone(),
            bounce: true,
            body: None,
            state_init: None,
        }
    }

    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_bounce(mut self, bounce: bool) -> Self {
        self.bounce = bounce;
        self
    }

    pub fn with_body(mut self, body: Cell) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn with_body_ref(mut self, body: &ArcCell) -> Self {
        self.body = Some(body.clone());
        self
    }

    /// Deployment payload for the *destination* account (not the sender).
    pub fn with_state_init(mut self, state_init: StateInit) -> Self {
        self.state_init = Some(state_init);
        self
    }

    /// Serializes the `int_msg_info` layout. Forwarding fees and creation
    /// timestamps are left zero, the ledger fills them in transit.
    pub fn build(&self) -> Result<Cell, TonCellError> {
        let mut builder = CellBuilder::new();
        builder
            .store_bit(false)? // int_msg_info tag
            .store_bit(true)? // ihr_disabled
            .store_bit(self.bounce)?
            .store_bit(false)? // bounced
            .store_address(&TonAddress::NULL)? // src, filled by the ledger
            .store_address(&self.dest)?
            .store_coins(&self.value)?
            .store_coins(&BigUint::zero())? // ihr_fee
            .store_coins(&BigUint::zero())? // fwd_fee
            .store_u64(64, 0)? // created_lt
            .store_u32(32, 0)?; // created_at
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
        builder.store_maybe_cell_ref(&self.body)?;
        Ok(builder.build()?)
    }
}
