use crate::cell::{ArcCell, Cell, CellBuilder, TonCellError};
use crate::types::TonHash;
use crate::wallet::versioned::v3::{check_msg_count, read_msgs, write_msgs};
use crate::wallet::WalletError;

/// Persistent data of `WalletVersion::V4R1 | WalletVersion::V4R2`; the
/// trailing bit is the (empty) plugin dictionary.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WalletDataV4 {
    pub seqno: u32,
    pub wallet_id: i32,
    pub public_key: TonHash,
}

impl WalletDataV4 {
    pub fn new(wallet_id: i32, public_key: TonHash) -> Self {
        Self {
            seqno: 0,
            wallet_id,
            public_key,
        }
    }

    pub fn to_cell(&self) -> Result<Cell, TonCellError> {
        CellBuilder::new()
            .store_u32(32, self.seqno)?
            .store_i32(32, self.wallet_id)?
            .store_slice(&self.public_key)?
            .store_bit(false)? // empty plugin dict
            .build()
    }

    pub fn parse(cell: &Cell) -> Result<Self, TonCellError> {
        let mut parser = cell.parser();
        Ok(Self {
            seqno: parser.load_u32(32)?,
            wallet_id: parser.load_i32(32)?,
            public_key: parser.load_tonhash()?,
        })
    }
}

/// External-message body of the V4 family. The extra byte after the seqno
/// selects the operation; plain transfers always use opcode 0.
#[derive(Debug, PartialEq, Clone)]
pub struct WalletExtMsgBodyV4 {
    pub subwallet_id: i32,
    pub valid_until: u32,
    pub msg_seqno: u32,
    pub opcode: u8,
    pub msgs_modes: Vec<u8>,
    pub msgs: Vec<ArcCell>,
}

impl WalletExtMsgBodyV4 {
    pub fn build(&self) -> Result<Cell, WalletError> {
        check_msg_count(self.msgs.len())?;
        if self.opcode != 0 {
            return Err(WalletError::CellError(TonCellError::InternalError(
                format!("Unsupported opcode: {}", self.opcode),
            )));
        }
        let mut builder = CellBuilder::new();
        builder
            .store_i32(32, self.subwallet_id)?
            .store_u32(32, self.valid_until)?
            .store_u32(32, self.msg_seqno)?
            .store_u8(8, self.opcode)?;
        write_msgs(&mut builder, &self.msgs_modes, &self.msgs)?;
        Ok(builder.build()?)
    }

    pub fn parse(cell: &Cell) -> Result<Self, TonCellError> {
        let mut parser = cell.parser();
        let subwallet_id = parser.load_i32(32)?;
        let valid_until = parser.load_u32(32)?;
        let msg_seqno = parser.load_u32(32)?;
        let opcode = parser.load_u8(8)?;
        let (msgs_modes, msgs) = read_msgs(&mut parser, cell.references().len())?;
        Ok(Self {
            subwallet_id,
            valid_until,
            msg_seqno,
            opcode,
            msgs_modes,
            msgs,
        })
    }
}
