use nacl::sign::signature;

use crate::cell::{ArcCell, Cell, CellBuilder};
use crate::message::{ExternalMessage, StateInit, TransferMessage};
use crate::mnemonic::KeyPair;
use crate::wallet::{
    WalletError, WalletExtMsgBodyHighloadV2, WalletExtMsgBodyV3, WalletExtMsgBodyV4,
    WalletVersion, DEFAULT_WALLET_ID,
};
use crate::TonAddress;

/// Body-builder family, resolved once at wallet construction so the send
/// path never re-inspects the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletSpec {
    /// Sequence-number wallets (V3/V4 families).
    Regular { has_op: bool },
    /// Query-id wallets without a monotonic nonce.
    Highload,
}

impl WalletSpec {
    pub fn resolve(version: WalletVersion) -> Result<WalletSpec, WalletError> {
        match version {
            WalletVersion::V3R1 | WalletVersion::V3R2 => Ok(WalletSpec::Regular { has_op: false }),
            WalletVersion::V4R1 | WalletVersion::V4R2 => Ok(WalletSpec::Regular { has_op: true }),
            WalletVersion::HighloadV2R2 | WalletVersion::HighloadV2Verified => {
                Ok(WalletSpec::Highload)
            }
            WalletVersion::Lockup => Err(WalletError::UnsupportedVersion(version)),
        }
    }
}

/// Freshness/ordering input for a body build; the variant must match the
/// wallet's [`WalletSpec`] family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyParams {
    Seqno { seqno: u32, valid_until: u32 },
    Query { query_id: u64 },
}

/// Offline wallet identity: key pair, version, subwallet id and the address
/// derived from them. Construction is pure; no ledger access is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonWallet {
    pub key_pair: KeyPair,
    pub version: WalletVersion,
    pub address: TonAddress,
    pub wallet_id: i32,
    spec: WalletSpec,
}

impl TonWallet {
    pub fn derive(
        workchain: i32,
        version: WalletVersion,
        key_pair: &KeyPair,
        wallet_id: i32,
    ) -> Result<TonWallet, WalletError> {
        let spec = WalletSpec::resolve(version)?;
        let data = version.initial_data(&key_pair.public_key, wallet_id)?;
        let code = version.code()?;
        let state_init = StateInit::new(code.clone(), data.to_arc());
        let address = state_init.derive_address(workchain)?;
        Ok(TonWallet {
            key_pair: key_pair.clone(),
            version,
            address,
            wallet_id,
            spec,
        })
    }

    pub fn derive_default(
        version: WalletVersion,
        key_pair: &KeyPair,
    ) -> Result<TonWallet, WalletError> {
        Self::derive(0, version, key_pair, DEFAULT_WALLET_ID)
    }

    /// Sibling identity: same key and version, different subwallet id and
    /// therefore a different address.
    pub fn subwallet(&self, wallet_id: i32) -> Result<TonWallet, WalletError> {
        Self::derive(self.address.workchain, self.version, &self.key_pair, wallet_id)
    }

    pub fn spec(&self) -> WalletSpec {
        self.spec
    }

    /// Deployment payload reproducing the address derivation exactly.
    pub fn state_init(&self) -> Result<StateInit, WalletError> {
        let data = self
            .version
            .initial_data(&self.key_pair.public_key, self.wallet_id)?;
        Ok(StateInit::new(self.version.code()?.clone(), data.to_arc()))
    }

    /// Unsigned version-specific body for the given transfer intents.
    pub fn create_external_body(
        &self,
        params: &BodyParams,
        transfers: &[TransferMessage],
    ) -> Result<Cell, WalletError> {
        let mut msgs: Vec<ArcCell> = Vec::with_capacity(transfers.len());
        let mut msgs_modes = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            msgs.push(transfer.build()?.to_arc());
            msgs_modes.push(transfer.mode);
        }
        match (self.spec, params) {
            (WalletSpec::Regular { has_op: false }, BodyParams::Seqno { seqno, valid_until }) => {
                WalletExtMsgBodyV3 {
                    subwallet_id: self.wallet_id,
                    valid_until: *valid_until,
                    msg_seqno: *seqno,
                    msgs_modes,
                    msgs,
                }
                .build()
            }
            (WalletSpec::Regular { has_op: true }, BodyParams::Seqno { seqno, valid_until }) => {
                WalletExtMsgBodyV4 {
                    subwallet_id: self.wallet_id,
                    valid_until: *valid_until,
                    msg_seqno: *seqno,
                    opcode: 0,
                    msgs_modes,
                    msgs,
                }
                .build()
            }
            (WalletSpec::Highload, BodyParams::Query { query_id }) => {
                WalletExtMsgBodyHighloadV2 {
                    subwallet_id: self.wallet_id,
                    query_id: *query_id,
                    msgs_modes,
                    msgs,
                }
                .build()
            }
            _ => Err(WalletError::SpecMismatch(self.version)),
        }
    }

    /// Signs the body hash and prepends the 512-bit signature.
    pub fn sign_external_body(&self, external_body: &Cell) -> Result<Cell, WalletError> {
        let message_hash = external_body.cell_hash();
        let sign = signature(message_hash.as_slice(), self.key_pair.secret_key.as_slice())
            .map_err(|e| WalletError::SignatureError(e.message))?;
        let mut builder = CellBuilder::new();
        builder.store_slice(sign.as_slice())?;
        builder.store_cell(external_body)?;
        Ok(builder.build()?)
    }

    /// Builds the complete signed envelope; `deploying` attaches the
    /// self-deployment payload for a not-yet-active account.
    pub fn create_external_message(
        &self,
        params: &BodyParams,
        transfers: &[TransferMessage],
        deploying: bool,
    ) -> Result<ExternalMessage, WalletError> {
        let body = self.create_external_body(params, transfers)?;
        let signed = self.sign_external_body(&body)?;
        let state_init = if deploying {
            Some(self.state_init()?)
        } else {
            None
        };
        Ok(ExternalMessage::new(&self.address, state_init, signed.to_arc()))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use num_bigint::BigUint;

    use super::*;
    use crate::cell::CellParser;
    use crate::mnemonic::Mnemonic;
    use crate::wallet::WalletExtMsgBodyV4;

    const MNEMONIC_STR: &str = "fancy carpet hello mandate penalty trial consider property top vicious exit rebuild tragic profit urban major total month holiday sudden rib gather media vicious";

    fn make_key_pair() -> KeyPair {
        Mnemonic::from_str(MNEMONIC_STR, &None)
            .unwrap()
            .to_key_pair()
            .unwrap()
    }

    fn test_transfer() -> TransferMessage {
        let dest = TonAddress::from_str("EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrR").unwrap();
        TransferMessage::new(&dest, &BigUint::from(1_000_000u64))
    }

    // strips the 512-bit signature prefix, returning the raw body
    fn strip_signature(signed: &Cell) -> Cell {
        let mut parser = signed.parser();
        parser.load_bytes(64).unwrap();
        let mut builder = CellBuilder::new();
        for _ in 0..parser.remaining_bits() {
            builder.store_bit(parser.load_bit().unwrap()).unwrap();
        }
        while parser.remaining_refs() > 0 {
            builder
                .store_reference(&parser.next_reference().unwrap())
                .unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn derive_wallet_works() -> anyhow::Result<()> {
        let key_pair = make_key_pair();

        let wallet_v3 = TonWallet::derive_default(WalletVersion::V3R1, &key_pair)?;
        let expected_v3 = TonAddress::from_str("EQBiMfDMivebQb052Z6yR3jHrmwNhw1kQ5bcAUOBYsK_VPuK")?;
        assert_eq!(wallet_v3.address, expected_v3);

        let wallet_v3r2 = TonWallet::derive_default(WalletVersion::V3R2, &key_pair)?;
        let expected_v3r2 =
            TonAddress::from_str("EQA-RswW9QONn88ziVm4UKnwXDEot5km7GEEXsfie_0TFOCO")?;
        assert_eq!(wallet_v3r2.address, expected_v3r2);

        let wallet_v4r2 = TonWallet::derive_default(WalletVersion::V4R2, &key_pair)?;
        let expected_v4r2 =
            TonAddress::from_str("EQCDM_QGggZ3qMa_f3lRPk4_qLDnLTqdi6OkMAV2NB9r5TG3")?;
        assert_eq!(wallet_v4r2.address, expected_v4r2);
        Ok(())
    }

    #[test]
    fn derivation_is_deterministic() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let first = TonWallet::derive_default(WalletVersion::V4R2, &key_pair)?;
        let second = TonWallet::derive_default(WalletVersion::V4R2, &key_pair)?;
        assert_eq!(first.address, second.address);
        assert_eq!(first.wallet_id, 698983191);
        Ok(())
    }

    #[test]
    fn subwallets_get_distinct_addresses() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let wallet = TonWallet::derive_default(WalletVersion::V4R2, &key_pair)?;
        let subwallet = wallet.subwallet(DEFAULT_WALLET_ID + 1)?;
        assert_ne!(wallet.address, subwallet.address);
        assert_eq!(wallet.version, subwallet.version);
        assert_eq!(wallet.key_pair, subwallet.key_pair);

        let again = wallet.subwallet(DEFAULT_WALLET_ID + 1)?;
        assert_eq!(subwallet.address, again.address);
        Ok(())
    }

    #[test]
    fn lockup_fails_fast() {
        let key_pair = make_key_pair();
        let result = TonWallet::derive_default(WalletVersion::Lockup, &key_pair);
        assert!(matches!(
            result,
            Err(WalletError::UnsupportedVersion(WalletVersion::Lockup))
        ));
    }

    #[test]
    fn state_init_reproduces_address() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let wallet = TonWallet::derive_default(WalletVersion::V4R2, &key_pair)?;
        assert_eq!(wallet.state_init()?.derive_address(0)?, wallet.address);
        Ok(())
    }

    #[test]
    fn external_message_carries_state_init_only_when_deploying() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let wallet = TonWallet::derive_default(WalletVersion::V4R2, &key_pair)?;
        let params = BodyParams::Seqno {
            seqno: 0,
            valid_until: 1700000000,
        };

        let deploying = wallet.create_external_message(&params, &[test_transfer()], true)?;
        assert!(deploying.state_init.is_some());
        assert_eq!(deploying.dest, wallet.address);

        let plain = wallet.create_external_message(&params, &[test_transfer()], false)?;
        assert!(plain.state_init.is_none());
        Ok(())
    }

    #[test]
    fn signed_body_contains_versioned_fields() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let wallet = TonWallet::derive_default(WalletVersion::V4R2, &key_pair)?;
        let params = BodyParams::Seqno {
            seqno: 7,
            valid_until: 13,
        };
        let ext = wallet.create_external_message(&params, &[test_transfer()], false)?;

        let body = strip_signature(&ext.body);
        let parsed = WalletExtMsgBodyV4::parse(&body)?;
        assert_eq!(parsed.subwallet_id, DEFAULT_WALLET_ID);
        assert_eq!(parsed.valid_until, 13);
        assert_eq!(parsed.msg_seqno, 7);
        assert_eq!(parsed.opcode, 0);
        assert_eq!(parsed.msgs_modes, vec![3]);
        Ok(())
    }

    #[test]
    fn signing_is_deterministic() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let wallet = TonWallet::derive_default(WalletVersion::V3R2, &key_pair)?;
        let body = CellBuilder::new().store_u32(32, 1)?.build()?;
        let first = wallet.sign_external_body(&body)?;
        let second = wallet.sign_external_body(&body)?;
        assert_eq!(first.cell_hash(), second.cell_hash());
        assert_eq!(first.bit_len(), 512 + body.bit_len());
        Ok(())
    }

    #[test]
    fn highload_body_uses_query_id() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let wallet = TonWallet::derive_default(WalletVersion::HighloadV2R2, &key_pair)?;
        let query_id = (1700000000u64 << 32) | 42;
        let ext = wallet.create_external_message(
            &BodyParams::Query { query_id },
            &[test_transfer()],
            false,
        )?;

        let body = strip_signature(&ext.body);
        let mut parser: CellParser = body.parser();
        assert_eq!(parser.load_i32(32)?, DEFAULT_WALLET_ID);
        assert_eq!(parser.load_u64(64)?, query_id);
        assert!(parser.load_bit()?);
        Ok(())
    }

    #[test]
    fn mismatched_params_are_rejected() -> anyhow::Result<()> {
        let key_pair = make_key_pair();
        let wallet = TonWallet::derive_default(WalletVersion::V3R2, &key_pair)?;
        let result = wallet.create_external_body(
            &BodyParams::Query { query_id: 5 },
            &[test_transfer()],
        );
        assert!(matches!(result, Err(WalletError::SpecMismatch(_))));
        Ok(())
    }
}
