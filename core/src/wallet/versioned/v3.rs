use crate::cell::{ArcCell, Cell, CellBuilder, CellParser, TonCellError};
use crate::types::TonHash;
use crate::wallet::versioned::MAX_REGULAR_MESSAGES;
use crate::wallet::WalletError;

/// Persistent data of `WalletVersion::V3R1 | WalletVersion::V3R2`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WalletDataV3 {
    pub seqno: u32,
    pub wallet_id: i32,
    pub public_key: TonHash,
}

impl WalletDataV3 {
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

/// External-message body of the V3 family; the signature is prepended by
/// the caller and is not part of this layout.
#[derive(Debug, PartialEq, Clone)]
pub struct WalletExtMsgBodyV3 {
    pub subwallet_id: i32,
    pub valid_until: u32,
    pub msg_seqno: u32,
    pub msgs_modes: Vec<u8>,
    pub msgs: Vec<ArcCell>,
}

impl WalletExtMsgBodyV3 {
    pub fn build(&self) -> Result<Cell, WalletError> {
        check_msg_count(self.msgs.len())?;
        let mut builder = CellBuilder::new();
        builder
            .store_i32(32, self.subwallet_id)?
            .store_u32(32, self.valid_until)?
            .store_u32(32, self.msg_seqno)?;
        write_msgs(&mut builder, &self.msgs_modes, &self.msgs)?;
        Ok(builder.build()?)
    }

    pub fn parse(cell: &Cell) -> Result<Self, TonCellError> {
        let mut parser = cell.parser();
        let subwallet_id = parser.load_i32(32)?;
        let valid_until = parser.load_u32(32)?;
        let msg_seqno = parser.load_u32(32)?;
        let (msgs_modes, msgs) = read_msgs(&mut parser, cell.references().len())?;
        Ok(Self {
            subwallet_id,
            valid_until,
            msg_seqno,
            msgs_modes,
            msgs,
        })
    }
}

pub(crate) fn check_msg_count(count: usize) -> Result<(), WalletError> {
    if count == 0 || count > MAX_REGULAR_MESSAGES {
        return Err(WalletError::TooManyMessages {
            count,
            max: MAX_REGULAR_MESSAGES,
        });
    }
    Ok(())
}

pub(crate) fn write_msgs(
    builder: &mut CellBuilder,
    modes: &[u8],
    msgs: &[ArcCell],
) -> Result<(), TonCellError> {
    for (mode, msg) in modes.iter().zip(msgs.iter()) {
        builder.store_u8(8, *mode)?;
        builder.store_reference(msg)?;
    }
    Ok(())
}

pub(crate) fn read_msgs(
    parser: &mut CellParser,
    count: usize,
) -> Result<(Vec<u8>, Vec<ArcCell>), TonCellError> {
    let mut msgs_modes = Vec::with_capacity(count);
    let mut msgs = Vec::with_capacity(count);
    for _ in 0..count {
        msgs_modes.push(parser.load_u8(8)?);
        msgs.push(parser.next_reference()?);
    }
    Ok((msgs_modes, msgs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::DEFAULT_WALLET_ID;

    #[test]
    fn body_round_trip() -> anyhow::Result<()> {
        let msg = CellBuilder::new().store_u32(32, 9)?.build()?.to_arc();
        let body = WalletExtMsgBodyV3 {
            subwallet_id: DEFAULT_WALLET_ID,
            valid_until: 13,
            msg_seqno: 7,
            msgs_modes: vec![3],
            msgs: vec![msg],
        };
        let cell = body.build()?;
        assert_eq!(WalletExtMsgBodyV3::parse(&cell)?, body);
        Ok(())
    }

    #[test]
    fn rejects_more_than_four_messages() -> anyhow::Result<()> {
        let msg = CellBuilder::new().build()?.to_arc();
        let body = WalletExtMsgBodyV3 {
            subwallet_id: DEFAULT_WALLET_ID,
            valid_until: 0,
            msg_seqno: 0,
            msgs_modes: vec![3; 5],
            msgs: vec![msg; 5],
        };
        assert!(matches!(
            body.build(),
            Err(WalletError::TooManyMessages { count: 5, .. })
        ));
        Ok(())
    }

    #[test]
    fn data_round_trip() -> anyhow::Result<()> {
        let data = WalletDataV3::new(DEFAULT_WALLET_ID, [7u8; 32]);
        let cell = data.to_cell()?;
        assert_eq!(cell.bit_len(), 32 + 32 + 256);
        assert_eq!(WalletDataV3::parse(&cell)?, data);
        Ok(())
    }
}
