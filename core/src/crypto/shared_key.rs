use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha512};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::crypto::TonCryptoError;

/// TON-style key agreement over ed25519 signing keys.
///
/// The peer's ed25519 public key is mapped to its montgomery form and the
/// local signing seed is expanded the ed25519 way (SHA-512, clamped) into an
/// x25519 scalar, so both sides of a conversation derive the same secret
/// from their signing key pairs.
pub fn shared_secret(
    own_secret_key: &[u8],
    their_public_key: &[u8],
) -> Result<[u8; 32], TonCryptoError> {
    let seed: [u8; 32] = own_secret_key
        .get(0..32)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            TonCryptoError::InvalidKey("Secret key must be at least 32 bytes".to_string())
        })?;
    let their_key: [u8; 32] = their_public_key.try_into().map_err(|_| {
        TonCryptoError::InvalidKey("Public key must be exactly 32 bytes".to_string())
    })?;

    let edwards = CompressedEdwardsY(their_key)
        .decompress()
        .ok_or_else(|| {
            TonCryptoError::InvalidKey("Public key is not a valid curve point".to_string())
        })?;
    let montgomery = edwards.to_montgomery();

    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&Sha512::digest(seed)[0..32]);
    let secret = StaticSecret::from(scalar);

    Ok(secret
        .diffie_hellman(&PublicKey::from(montgomery.to_bytes()))
        .to_bytes())
}
