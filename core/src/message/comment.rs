//! Plain and encrypted transfer comments.
//!
//! The encrypted construction reproduces the on-wire protocol exactly,
//! including its key schedule: the message key doubles as the CBC IV seed
//! and the recipient check is a XOR of the two public keys. That XOR is a
//! weak authentication signal (anyone holding either public key can invert
//! it); it is kept as-is for wire compatibility and must not be treated as
//! a proof of sender identity. Integrity comes from the msg-key HMAC check
//! performed after decryption.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha512;

use crate::cell::{Cell, CellBuilder, TonCellError};
use crate::crypto::{shared_secret, TonCryptoError};
use crate::message::TonMessageError;
use crate::mnemonic::KeyPair;
use crate::TonAddress;

pub const ENCRYPTED_COMMENT_OPCODE: u32 = 0x2167da4b;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Plain-text comment: zero opcode plus snake-encoded UTF-8.
pub fn build_comment_cell(text: &str) -> Result<Cell, TonCellError> {
    CellBuilder::new()
        .store_u32(32, 0)?
        .store_snake_data(text.as_bytes())?
        .build()
}

/// Encrypts `text` so that only the holder of `their_public_key` (and the
/// sender) can read it. `sender` must be the sender's wallet address; its
/// canonical string form keys the integrity HMAC.
pub fn build_encrypted_comment_cell(
    text: &str,
    sender: &TonAddress,
    our_key_pair: &KeyPair,
    their_public_key: &[u8],
) -> Result<Cell, TonMessageError> {
    let shared = shared_secret(&our_key_pair.secret_key, their_public_key)?;

    let data = text.as_bytes();
    let mut prefix_len = 16;
    if data.len() % 16 != 0 {
        prefix_len += 16 - data.len() % 16;
    }
    let mut padded = vec![0u8; prefix_len + data.len()];
    padded[0] = prefix_len as u8;
    rand::thread_rng().fill_bytes(&mut padded[1..prefix_len]);
    padded[prefix_len..].copy_from_slice(data);

    let full_key = hmac_sha512(comment_hmac_key(sender).as_bytes(), &padded)?;
    let msg_key = &full_key[0..16];
    let schedule = hmac_sha512(&shared, msg_key)?;
    let ciphertext = aes_cbc_encryptor(&schedule)?.encrypt_padded_vec_mut::<NoPadding>(&padded);

    let xor_key = xor_public_keys(&our_key_pair.public_key, their_public_key)?;

    let mut builder = CellBuilder::new();
    builder.store_u32(32, ENCRYPTED_COMMENT_OPCODE)?;
    builder.store_slice(&xor_key)?;
    builder.store_slice(msg_key)?;
    builder.store_snake_data(&ciphertext)?;
    Ok(builder.build()?)
}

/// Inverse of [`build_encrypted_comment_cell`]; `their_public_key` is the
/// *sender's* public key here. Every structural or integrity failure is
/// reported as [`TonMessageError::MalformedComment`] — a tampered comment
/// never decrypts to wrong plaintext silently.
pub fn decrypt_comment_cell(
    comment: &Cell,
    sender: &TonAddress,
    our_key_pair: &KeyPair,
    their_public_key: &[u8],
) -> Result<Vec<u8>, TonMessageError> {
    let mut parser = comment.parser();
    let opcode = parser.load_u32(32)?;
    if opcode != ENCRYPTED_COMMENT_OPCODE {
        return Err(TonMessageError::MalformedComment(format!(
            "opcode {:#x} is not an encrypted comment",
            opcode
        )));
    }

    let xor_key = parser.load_bytes(32)?;
    let unmasked = xor_public_keys(&xor_key, their_public_key)?;
    if unmasked.as_slice() != our_key_pair.public_key.as_slice() {
        return Err(TonMessageError::MalformedComment(
            "comment was encrypted for a different key pair".to_string(),
        ));
    }

    let msg_key = parser.load_bytes(16)?;
    let shared = shared_secret(&our_key_pair.secret_key, their_public_key)?;
    let schedule = hmac_sha512(&shared, &msg_key)?;

    let ciphertext = parser.load_snake_data()?;
    if ciphertext.len() < 32 || ciphertext.len() % 16 != 0 {
        return Err(TonMessageError::MalformedComment(format!(
            "invalid ciphertext length {}",
            ciphertext.len()
        )));
    }

    let padded = aes_cbc_decryptor(&schedule)?
        .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
        .map_err(|_| {
            TonMessageError::MalformedComment("ciphertext is not block-aligned".to_string())
        })?;

    let prefix_len = padded[0] as usize;
    if prefix_len > 31 {
        return Err(TonMessageError::MalformedComment(format!(
            "invalid padding prefix size {}",
            prefix_len
        )));
    }
    if hmac_sha512(comment_hmac_key(sender).as_bytes(), &padded)?[0..16] != msg_key[..] {
        return Err(TonMessageError::MalformedComment(
            "message key mismatch".to_string(),
        ));
    }

    Ok(padded[prefix_len..].to_vec())
}

/// The wallet renders its own address non-bounceable, so that form keys
/// the comment HMAC on both ends.
fn comment_hmac_key(sender: &TonAddress) -> String {
    sender.to_base64_url_flags(true, false)
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64], TonCryptoError> {
    let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(key)
        .map_err(|e| TonCryptoError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

fn aes_cbc_encryptor(schedule: &[u8; 64]) -> Result<Aes256CbcEnc, TonMessageError> {
    Aes256CbcEnc::new_from_slices(&schedule[0..32], &schedule[32..48])
        .map_err(|e| TonCryptoError::InvalidKey(e.to_string()).into())
}

fn aes_cbc_decryptor(schedule: &[u8; 64]) -> Result<Aes256CbcDec, TonMessageError> {
    Aes256CbcDec::new_from_slices(&schedule[0..32], &schedule[32..48])
        .map_err(|e| TonCryptoError::InvalidKey(e.to_string()).into())
}

fn xor_public_keys(a: &[u8], b: &[u8]) -> Result<Vec<u8>, TonCryptoError> {
    if a.len() != 32 || b.len() != 32 {
        return Err(TonCryptoError::InvalidKey(
            "Public keys must be 32 bytes".to_string(),
        ));
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect())
}
