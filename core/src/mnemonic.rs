mod error;

use std::cmp;
use std::collections::HashSet;
use std::fmt;

pub use error::*;
use hmac::{Hmac, Mac};
use lazy_static::lazy_static;
use nacl::sign::generate_keypair;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

const WORDLIST_EN: &str = include_str!("mnemonic/wordlist.EN");
const PBKDF_ITERATIONS: u32 = 100000;

lazy_static! {
    static ref WORDLIST_EN_SET: HashSet<&'static str> = WORDLIST_EN
        .split('\n')
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
}

/// TON-standard 24-word recovery phrase.
pub struct Mnemonic {
    words: Vec<String>,
    password: Option<String>,
}

/// Ed25519 key pair in the tweetnacl layout: 32-byte public key and a
/// 64-byte secret key holding `seed || public_key`.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub secret_key: Vec<u8>,
}

impl KeyPair {
    pub fn from_seed(seed: &[u8; 32]) -> KeyPair {
        let key_pair = generate_keypair(seed);
        KeyPair {
            public_key: key_pair.pkey.to_vec(),
            secret_key: key_pair.skey.to_vec(),
        }
    }

    /// Rebuilds the pair from a 64-byte tweetnacl secret key.
    pub fn from_secret_key(secret_key: &[u8]) -> Result<KeyPair, MnemonicError> {
        if secret_key.len() != 64 {
            return Err(MnemonicError::InvalidSecretKeyLength(secret_key.len()));
        }
        Ok(KeyPair {
            public_key: secret_key[32..].to_vec(),
            secret_key: secret_key.to_vec(),
        })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"***REDACTED***")
            .finish()
    }
}

impl Mnemonic {
    pub fn new(words: Vec<&str>, password: &Option<String>) -> Result<Mnemonic, MnemonicError> {
        let normalized_words: Vec<String> = words.iter().map(|w| w.trim().to_lowercase()).collect();

        if normalized_words.len() != 24 {
            return Err(MnemonicError::UnexpectedWordCount(normalized_words.len()));
        }
        for word in &normalized_words {
            if !WORDLIST_EN_SET.contains(word.as_str()) {
                return Err(MnemonicError::InvalidWord(word.clone()));
            }
        }

        // basis check: the seed-version KDF marks whether the phrase was
        // generated with or without a password
        match password {
            Some(s) if !s.is_empty() => {
                let passless_entropy = to_entropy(&normalized_words, &None)?;
                let seed = pbkdf2_sha512(&passless_entropy, "TON fast seed version", 1);
                if seed[0] != 1 {
                    return Err(MnemonicError::InvalidFirstByte(seed[0]));
                }
                let entropy = to_entropy(&normalized_words, password)?;
                let seed = pbkdf2_sha512(
                    &entropy,
                    "TON seed version",
                    cmp::max(1, PBKDF_ITERATIONS / 256),
                );
                if seed[0] == 0 {
                    return Err(MnemonicError::InvalidFirstByte(seed[0]));
                }
            }
            _ => {
                let entropy = to_entropy(&normalized_words, &None)?;
                let seed = pbkdf2_sha512(
                    &entropy,
                    "TON seed version",
                    cmp::max(1, PBKDF_ITERATIONS / 256),
                );
                if seed[0] != 0 {
                    return Err(MnemonicError::InvalidPasswordlessMnemonicFirstByte(seed[0]));
                }
            }
        }

        Ok(Mnemonic {
            words: normalized_words,
            password: password.clone(),
        })
    }

    pub fn from_str(s: &str, password: &Option<String>) -> Result<Mnemonic, MnemonicError> {
        let words: Vec<&str> = s
            .split(' ')
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .collect();
        Mnemonic::new(words, password)
    }

    pub fn to_key_pair(&self) -> Result<KeyPair, MnemonicError> {
        let entropy = to_entropy(&self.words, &self.password)?;
        let seed = pbkdf2_sha512(&entropy, "TON default seed", PBKDF_ITERATIONS);
        let mut seed32 = [0u8; 32];
        seed32.copy_from_slice(&seed[0..32]);
        Ok(KeyPair::from_seed(&seed32))
    }
}

fn to_entropy(words: &[String], password: &Option<String>) -> Result<Vec<u8>, MnemonicError> {
    let mut mac = Hmac::<Sha512>::new_from_slice(words.join(" ").as_bytes())?;
    if let Some(s) = password {
        mac.update(s.as_bytes());
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

fn pbkdf2_sha512(key: &[u8], salt: &str, rounds: u32) -> [u8; 64] {
    let mut output = [0u8; 64];
    pbkdf2_hmac::<Sha512>(key, salt.as_bytes(), rounds, &mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_parse_works() -> anyhow::Result<()> {
        let words = "dose ice enrich trigger test dove century still betray gas diet dune use other base gym mad law immense village world example praise game";
        assert!(Mnemonic::from_str(words, &None).is_ok());

        let words = " dose ice enrich trigger test dove \
        century still betray gas diet       dune use other base gym mad law \
        immense village world example praise game ";
        assert!(Mnemonic::from_str(words, &None).is_ok());
        Ok(())
    }

    #[test]
    fn mnemonic_validate_works() -> anyhow::Result<()> {
        let mnemonic = Mnemonic::new(
            vec![
                "dose", "ice", "enrich", "trigger", "test", "dove", "century", "still", "betray",
                "gas", "diet", "dune",
            ],
            &None,
        );
        assert!(mnemonic.is_err());
        let mnemonic = Mnemonic::new(vec!["a"], &None);
        assert!(mnemonic.is_err());
        Ok(())
    }

    #[test]
    fn mnemonic_to_key_pair_works() -> anyhow::Result<()> {
        let mnemonic = Mnemonic::new(
            vec![
                "dose", "ice", "enrich", "trigger", "test", "dove", "century", "still", "betray",
                "gas", "diet", "dune", "use", "other", "base", "gym", "mad", "law", "immense",
                "village", "world", "example", "praise", "game",
            ],
            &None,
        )?;
        let expected = "119dcf2840a3d56521d260b2f125eedc0d4f3795b9e627269a4b5a6dca8257bdc04ad1885c127fe863abb00752fa844e6439bb04f264d70de7cea580b32637ab";

        let key_pair = mnemonic.to_key_pair()?;
        assert_eq!(hex::encode(&key_pair.secret_key), expected);
        assert_eq!(&key_pair.secret_key[32..], key_pair.public_key.as_slice());
        Ok(())
    }

    #[test]
    fn key_pair_debug_redacts_secret() {
        let key_pair = KeyPair {
            public_key: vec![1, 2, 3],
            secret_key: vec![4, 5, 6],
        };
        let debug_output = format!("{:?}", key_pair);
        assert_eq!(
            debug_output,
            "KeyPair { public_key: [1, 2, 3], secret_key: \"***REDACTED***\" }"
        );
    }

    #[test]
    fn key_pair_from_secret_key_round_trip() -> anyhow::Result<()> {
        let key_pair = KeyPair::from_seed(&[7u8; 32]);
        let restored = KeyPair::from_secret_key(&key_pair.secret_key)?;
        assert_eq!(restored, key_pair);
        assert!(KeyPair::from_secret_key(&[0u8; 32]).is_err());
        Ok(())
    }
}
