use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use crc::Crc;
use lazy_static::lazy_static;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{TonAddressParseError, TonHash, ZERO_HASH};

lazy_static! {
    static ref CRC_16_XMODEM: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_XMODEM);
}

#[derive(PartialEq, Eq, Clone, Hash)]
pub struct TonAddress {
    pub workchain: i32,
    pub hash_part: TonHash,
}

impl TonAddress {
    pub const NULL: TonAddress = TonAddress {
        workchain: 0,
        hash_part: ZERO_HASH,
    };

    pub fn new(workchain: i32, hash_part: &TonHash) -> TonAddress {
        TonAddress {
            workchain,
            hash_part: *hash_part,
        }
    }

    pub fn from_hex_str(s: &str) -> Result<TonAddress, TonAddressParseError> {
        let (wc_str, hash_str) = s.split_once(':').ok_or_else(|| {
            TonAddressParseError::new(s, "Invalid hex address string: wrong address format")
        })?;
        let workchain = wc_str.parse::<i32>().map_err(|_| {
            TonAddressParseError::new(s, "Invalid hex address string: parse int error")
        })?;
        let decoded = hex::decode(hash_str).map_err(|_| {
            TonAddressParseError::new(s, "Invalid hex address string: hex decode error")
        })?;
        let hash_part: TonHash = decoded.as_slice().try_into().map_err(|_| {
            TonAddressParseError::new(s, "Invalid hex address string: wrong hash length")
        })?;
        Ok(TonAddress::new(workchain, &hash_part))
    }

    pub fn from_base64_url(s: &str) -> Result<TonAddress, TonAddressParseError> {
        Ok(Self::from_base64_url_flags(s)?.0)
    }

    /// Parses the url-safe base64 form.
    ///
    /// # Returns
    /// the address, non-bounceable flag, non-production flag.
    pub fn from_base64_url_flags(
        s: &str,
    ) -> Result<(TonAddress, bool, bool), TonAddressParseError> {
        let bytes = URL_SAFE_NO_PAD.decode(s).map_err(|_| {
            TonAddressParseError::new(s, "Invalid base64url address: decode error")
        })?;
        Self::from_base64_src(&bytes, s)
    }

    pub fn from_base64_std(s: &str) -> Result<TonAddress, TonAddressParseError> {
        Ok(Self::from_base64_std_flags(s)?.0)
    }

    /// Parses the standard base64 form.
    ///
    /// # Returns
    /// the address, non-bounceable flag, non-production flag.
    pub fn from_base64_std_flags(
        s: &str,
    ) -> Result<(TonAddress, bool, bool), TonAddressParseError> {
        let bytes = STANDARD_NO_PAD.decode(s).map_err(|_| {
            TonAddressParseError::new(s, "Invalid base64std address: decode error")
        })?;
        Self::from_base64_src(&bytes, s)
    }

    fn from_base64_src(
        bytes: &[u8],
        src: &str,
    ) -> Result<(TonAddress, bool, bool), TonAddressParseError> {
        let bytes: &[u8; 36] = bytes.try_into().map_err(|_| {
            TonAddressParseError::new(src, "Invalid base64 address: wrong byte length")
        })?;
        let (non_production, non_bounceable) = match bytes[0] {
            0x11 => (false, false),
            0x51 => (false, true),
            0x91 => (true, false),
            0xd1 => (true, true),
            _ => {
                return Err(TonAddressParseError::new(
                    src,
                    "Invalid base64 address: wrong tag byte",
                ))
            }
        };
        let workchain = bytes[1] as i8 as i32;
        let calc_crc = CRC_16_XMODEM.checksum(&bytes[0..34]);
        let addr_crc = ((bytes[34] as u16) << 8) | bytes[35] as u16;
        if calc_crc != addr_crc {
            return Err(TonAddressParseError::new(
                src,
                "Invalid base64 address: CRC mismatch",
            ));
        }
        let hash_part: TonHash = bytes[2..34].try_into().map_err(|_| {
            TonAddressParseError::new(src, "Invalid base64 address: unexpected error")
        })?;
        Ok((TonAddress::new(workchain, &hash_part), non_bounceable, non_production))
    }

    pub fn to_hex(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    pub fn to_base64_url(&self) -> String {
        self.to_base64_url_flags(false, false)
    }

    pub fn to_base64_url_flags(&self, non_bounceable: bool, non_production: bool) -> String {
        URL_SAFE_NO_PAD.encode(self.to_base64_src(non_bounceable, non_production))
    }

    pub fn to_base64_std(&self) -> String {
        self.to_base64_std_flags(false, false)
    }

    pub fn to_base64_std_flags(&self, non_bounceable: bool, non_production: bool) -> String {
        STANDARD_NO_PAD.encode(self.to_base64_src(non_bounceable, non_production))
    }

    fn to_base64_src(&self, non_bounceable: bool, non_production: bool) -> [u8; 36] {
        let tag: u8 = match (non_production, non_bounceable) {
            (false, false) => 0x11,
            (false, true) => 0x51,
            (true, false) => 0x91,
            (true, true) => 0xd1,
        };
        let mut bytes: [u8; 36] = [0; 36];
        bytes[0] = tag;
        bytes[1] = (self.workchain & 0xff) as u8;
        bytes[2..34].clone_from_slice(self.hash_part.as_slice());
        let crc = CRC_16_XMODEM.checksum(&bytes[0..34]);
        bytes[34] = ((crc >> 8) & 0xff) as u8;
        bytes[35] = (crc & 0xff) as u8;
        bytes
    }
}

impl Display for TonAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_base64_url().as_str())
    }
}

impl Debug for TonAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_base64_url().as_str())
    }
}

impl FromStr for TonAddress {
    type Err = TonAddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 48 {
            // Some form of base64 address, check which one
            if s.contains('-') || s.contains('_') {
                TonAddress::from_base64_url(s)
            } else {
                TonAddress::from_base64_std(s)
            }
        } else {
            TonAddress::from_hex_str(s)
        }
    }
}

impl Serialize for TonAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_base64_url().as_str())
    }
}

struct TonAddressVisitor;

impl<'de> Visitor<'de> for TonAddressVisitor {
    type Value = TonAddress;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a string with a TON address in hex or base64 form")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for TonAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TonAddressVisitor)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn format_works() -> anyhow::Result<()> {
        let bytes: TonHash =
            hex::decode("e4d954ef9f4e1250a26b5bbad76a1cdd17cfd08babad6f4c23e372270aef6f76")?
                .as_slice()
                .try_into()?;
        let addr = TonAddress::new(0, &bytes);
        assert_eq!(
            addr.to_hex(),
            "0:e4d954ef9f4e1250a26b5bbad76a1cdd17cfd08babad6f4c23e372270aef6f76"
        );
        assert_eq!(
            addr.to_base64_url(),
            "EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrR"
        );
        assert_eq!(
            addr.to_base64_std(),
            "EQDk2VTvn04SUKJrW7rXahzdF8/Qi6utb0wj43InCu9vdjrR"
        );
        Ok(())
    }

    #[test]
    fn parse_format_round_trip() -> anyhow::Result<()> {
        for src in [
            "EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrR",
            "UQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdmcU",
        ] {
            let (addr, non_bounceable, non_production) =
                TonAddress::from_base64_url_flags(src)?;
            assert!(!non_production);
            assert_eq!(non_bounceable, src.starts_with("UQ"));
            assert_eq!(addr.to_base64_url_flags(non_bounceable, false), src);
        }

        let from_hex = TonAddress::from_hex_str(
            "0:e4d954ef9f4e1250a26b5bbad76a1cdd17cfd08babad6f4c23e372270aef6f76",
        )?;
        let from_b64 = TonAddress::from_str("EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrR")?;
        assert_eq!(from_hex, from_b64);
        Ok(())
    }

    #[test]
    fn parse_rejects_bad_crc() {
        let result = TonAddress::from_str("EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrS");
        assert!(result.is_err());
    }

    #[test]
    fn serde_uses_base64_url() -> anyhow::Result<()> {
        let addr =
            TonAddress::from_str("EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrR")?;
        let json = serde_json::to_string(&addr)?;
        assert_eq!(json, "\"EQDk2VTvn04SUKJrW7rXahzdF8_Qi6utb0wj43InCu9vdjrR\"");
        let parsed: TonAddress = serde_json::from_str(&json)?;
        assert_eq!(parsed, addr);
        Ok(())
    }
}
