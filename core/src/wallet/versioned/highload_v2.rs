use std::collections::BTreeMap;

use crate::cell::{build_dict, ArcCell, Cell, CellBuilder, TonCellError};
use crate::types::TonHash;
use crate::wallet::versioned::MAX_HIGHLOAD_MESSAGES;
use crate::wallet::WalletError;

/// Persistent data of the highload V2 family; the trailing bit is the
/// (empty) old-queries dictionary.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WalletDataHighloadV2R2 {
    pub wallet_id: i32,
    pub last_cleaned_time: u64,
    pub public_key: TonHash,
}

impl WalletDataHighloadV2R2 {
    pub fn new(wallet_id: i32, public_key: TonHash) -> Self {
        Self {
            wallet_id,
            last_cleaned_time: 0,
            public_key,
        }
    }

    pub fn to_cell(&self) -> Result<Cell, TonCellError> {
        CellBuilder::new()
            .store_i32(32, self.wallet_id)?
            .store_u64(64, self.last_cleaned_time)?
            .store_slice(&self.public_key)?
            .store_bit(false)? // empty queries dict
            .build()
    }

    pub fn parse(cell: &Cell) -> Result<Self, TonCellError> {
        let mut parser = cell.parser();
        Ok(Self {
            wallet_id: parser.load_i32(32)?,
            last_cleaned_time: parser.load_u64(64)?,
            public_key: parser.load_tonhash()?,
        })
    }
}

/// External-message body of the highload V2 family: no sequence number,
/// replay protection comes from the query id (expiry in the upper half,
/// random salt in the lower).
#[derive(Debug, PartialEq, Clone)]
pub struct WalletExtMsgBodyHighloadV2 {
    pub subwallet_id: i32,
    pub query_id: u64,
    pub msgs_modes: Vec<u8>,
    pub msgs: Vec<ArcCell>,
}

impl WalletExtMsgBodyHighloadV2 {
    pub fn build(&self) -> Result<Cell, WalletError> {
        let count = self.msgs.len();
        if count == 0 || count > MAX_HIGHLOAD_MESSAGES {
            return Err(WalletError::TooManyMessages {
                count,
                max: MAX_HIGHLOAD_MESSAGES,
            });
        }
        let entries: BTreeMap<u64, (u8, &ArcCell)> = self
            .msgs_modes
            .iter()
            .zip(self.msgs.iter())
            .enumerate()
            .map(|(i, (mode, msg))| (i as u64, (*mode, msg)))
            .collect();
        let dict = build_dict(16, &entries, |builder, (mode, msg)| {
            builder.store_u8(8, *mode)?;
            builder.store_reference(*msg)?;
            Ok(())
        })?;

        let mut builder = CellBuilder::new();
        builder
            .store_i32(32, self.subwallet_id)?
            .store_u64(64, self.query_id)?
            .store_bit(true)? // messages dict present
            .store_child(dict)?;
        Ok(builder.build()?)
    }

    /// Expiry timestamp baked into the query id.
    pub fn expires_at(&self) -> u32 {
        (self.query_id >> 32) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::DEFAULT_WALLET_ID;

    #[test]
    fn body_structure() -> anyhow::Result<()> {
        let msgs: Vec<ArcCell> = (0..10u32)
            .map(|i| {
                CellBuilder::new()
                    .store_u32(32, i)
                    .and_then(|b| b.build())
                    .map(Cell::to_arc)
            })
            .collect::<Result<_, _>>()?;
        let body = WalletExtMsgBodyHighloadV2 {
            subwallet_id: DEFAULT_WALLET_ID,
            query_id: (1700000000u64 << 32) | 12345,
            msgs_modes: vec![3; 10],
            msgs,
        };
        let cell = body.build()?;

        let mut parser = cell.parser();
        assert_eq!(parser.load_i32(32)?, DEFAULT_WALLET_ID);
        assert_eq!(parser.load_u64(64)?, body.query_id);
        assert!(parser.load_bit()?);
        assert_eq!(cell.references().len(), 1);
        assert_eq!(body.expires_at(), 1700000000);
        Ok(())
    }

    #[test]
    fn message_count_limit() -> anyhow::Result<()> {
        let msg = CellBuilder::new().build()?.to_arc();
        let body = WalletExtMsgBodyHighloadV2 {
            subwallet_id: DEFAULT_WALLET_ID,
            query_id: 1,
            msgs_modes: vec![3; 255],
            msgs: vec![msg; 255],
        };
        assert!(matches!(
            body.build(),
            Err(WalletError::TooManyMessages { count: 255, .. })
        ));
        Ok(())
    }

    #[test]
    fn data_round_trip() -> anyhow::Result<()> {
        let data = WalletDataHighloadV2R2::new(DEFAULT_WALLET_ID, [3u8; 32]);
        let cell = data.to_cell()?;
        assert_eq!(cell.bit_len(), 32 + 64 + 256 + 1);
        assert_eq!(WalletDataHighloadV2R2::parse(&cell)?, data);
        Ok(())
    }
}
