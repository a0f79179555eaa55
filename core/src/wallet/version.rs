use std::collections::HashMap;

use lazy_static::lazy_static;
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::cell::{ArcCell, BagOfCells, Cell, TonCellError};
use crate::types::TonHash;
use crate::wallet::versioned::{WalletDataHighloadV2R2, WalletDataV3, WalletDataV4};
use crate::wallet::WalletError;

/// Supported wallet contract versions. Every variant maps to exactly one
/// immutable code image, fixed at process start.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash, EnumIter)]
pub enum WalletVersion {
    V3R1,
    V3R2,
    V4R1,
    V4R2,
    HighloadV2R2,
    HighloadV2Verified,
    Lockup,
}

lazy_static! {
    /// Process-wide registry of wallet code cells. Built once from the
    /// bundled images; a broken image is a fatal startup error, the
    /// registry is all-or-nothing. Immutable afterwards, safe for
    /// concurrent readers.
    pub static ref WALLET_CODE_BY_VERSION: HashMap<WalletVersion, ArcCell> = {
        let mut by_version = HashMap::new();
        for version in WalletVersion::iter() {
            let code = BagOfCells::parse_base64(version.code_base64())
                .and_then(BagOfCells::single_root)
                .unwrap_or_else(|e| panic!("corrupted {version} wallet code image: {e}"));
            by_version.insert(version, code);
        }
        by_version
    };
}

impl WalletVersion {
    fn code_base64(&self) -> &'static str {
        match self {
            WalletVersion::V3R1 => include_str!("../../resources/wallet/wallet_v3r1.code"),
            WalletVersion::V3R2 => include_str!("../../resources/wallet/wallet_v3r2.code"),
            WalletVersion::V4R1 => include_str!("../../resources/wallet/wallet_v4r1.code"),
            WalletVersion::V4R2 => include_str!("../../resources/wallet/wallet_v4r2.code"),
            WalletVersion::HighloadV2R2 => {
                include_str!("../../resources/wallet/highload_v2r2.code")
            }
            WalletVersion::HighloadV2Verified => {
                include_str!("../../resources/wallet/highload_v2_verified.code")
            }
            WalletVersion::Lockup => include_str!("../../resources/wallet/lockup.code"),
        }
    }

    pub fn code(&self) -> Result<&'static ArcCell, TonCellError> {
        WALLET_CODE_BY_VERSION.get(self).ok_or_else(|| {
            TonCellError::InternalError(format!("No code found for {self:?}"))
        })
    }

    /// Initial data section deployed alongside the code; its layout pins
    /// the derived account address.
    pub fn initial_data(
        &self,
        public_key: &[u8],
        wallet_id: i32,
    ) -> Result<Cell, WalletError> {
        let public_key: TonHash = public_key.try_into().map_err(|_| {
            WalletError::InvalidPublicKey(public_key.len())
        })?;
        let data_cell = match self {
            WalletVersion::V3R1 | WalletVersion::V3R2 => {
                WalletDataV3::new(wallet_id, public_key).to_cell()?
            }
            WalletVersion::V4R1 | WalletVersion::V4R2 => {
                WalletDataV4::new(wallet_id, public_key).to_cell()?
            }
            WalletVersion::HighloadV2R2 | WalletVersion::HighloadV2Verified => {
                WalletDataHighloadV2R2::new(wallet_id, public_key).to_cell()?
            }
            WalletVersion::Lockup => {
                // lockup data carries operator-config the engine cannot invent
                return Err(WalletError::UnsupportedVersion(*self));
            }
        };
        Ok(data_cell)
    }

    /// V4-family bodies carry an extra opcode byte after the seqno.
    pub fn has_op(&self) -> bool {
        matches!(self, WalletVersion::V4R1 | WalletVersion::V4R2)
    }
}
