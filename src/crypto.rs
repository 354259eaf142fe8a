//! Hashing and signature primitives.
//!
//! All identity hashes are double SHA-256. Signatures are ECDSA over
//! secp256k1 with DER encoding; signing is RFC 6979 deterministic, so the
//! same key and digest always produce the same bytes.

use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use secp256k1::{ecdsa, Message, Secp256k1, SecretKey};
use serde::de::Error as SerdeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::PUBLIC_KEY_LEN;
use crate::error::{CryptoError, DecodeError};
use crate::types::Hash;

/// Double SHA-256: `SHA256(SHA256(data))`
pub fn dhash(data: &[u8]) -> Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(data);
    sha256d::Hash::from_engine(engine).to_byte_array()
}

/// A compressed secp256k1 public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Accept 33 raw bytes, checking only the compression prefix.
    ///
    /// Curve-point validity is deferred to signature verification so that
    /// inbound blocks naming unusable keys still decode.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Result<Self, DecodeError> {
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return Err(DecodeError::BadPublicKey);
        }
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(DecodeError::BadPublicKey);
        }
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(bytes);
        Self::from_bytes(out)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let decoded = hex::decode(s).map_err(|_| DecodeError::BadHex)?;
        Self::from_slice(&decoded)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(D::Error::custom)
    }
}

/// A secp256k1 signing key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::BadPrivateKey)
    }

    /// Compressed public key for this signing key
    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        let pubkey = secp256k1::PublicKey::from_secret_key(&secp, &self.0);
        PublicKey(pubkey.serialize())
    }
}

/// Sign a 32-byte digest, returning the DER-encoded signature.
pub fn sign_digest(key: &PrivateKey, digest: &Hash) -> Vec<u8> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest).expect("digest is 32 bytes");
    secp.sign_ecdsa(&message, &key.0).serialize_der().to_vec()
}

/// Verify a DER-encoded signature over a 32-byte digest.
///
/// Returns `Ok(false)` for a well-formed signature that does not match, and
/// `BadSignatureEncoding` when the bytes are not parseable DER. A public
/// key that is not a valid curve point verifies nothing.
pub fn verify_digest(
    key: &PublicKey,
    digest: &Hash,
    signature: &[u8],
) -> Result<bool, CryptoError> {
    let pubkey = match secp256k1::PublicKey::from_slice(&key.0) {
        Ok(pk) => pk,
        Err(_) => return Ok(false),
    };
    let signature =
        ecdsa::Signature::from_der(signature).map_err(|_| CryptoError::BadSignatureEncoding)?;
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest).expect("digest is 32 bytes");
    Ok(secp.verify_ecdsa(&message, &signature, &pubkey).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(seed: u8) -> PrivateKey {
        PrivateKey::from_bytes(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_dhash_known_vector() {
        // Double SHA-256 of the empty string
        assert_eq!(
            hex::encode(dhash(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_dhash_is_deterministic() {
        assert_eq!(dhash(b"pixel"), dhash(b"pixel"));
        assert_ne!(dhash(b"pixel"), dhash(b"pixels"));
    }

    #[test]
    fn test_sign_and_verify_round_trip() {
        let key = test_key(7);
        let pubkey = key.public_key();
        let digest = dhash(b"message");

        let signature = sign_digest(&key, &digest);
        assert!(verify_digest(&pubkey, &digest, &signature).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = test_key(9);
        let digest = dhash(b"message");
        assert_eq!(sign_digest(&key, &digest), sign_digest(&key, &digest));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let key = test_key(7);
        let other = test_key(8);
        let digest = dhash(b"message");
        let signature = sign_digest(&key, &digest);
        assert!(!verify_digest(&other.public_key(), &digest, &signature).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_digest() {
        let key = test_key(7);
        let signature = sign_digest(&key, &dhash(b"message"));
        assert!(!verify_digest(&key.public_key(), &dhash(b"other"), &signature).unwrap());
    }

    #[test]
    fn test_tampered_value_byte_fails_verification() {
        let key = test_key(7);
        let digest = dhash(b"message");
        let mut signature = sign_digest(&key, &digest);
        // Flip a bit inside the r value, leaving the DER framing intact
        signature[10] ^= 0x01;
        assert!(!verify_digest(&key.public_key(), &digest, &signature).unwrap());
    }

    #[test]
    fn test_garbage_signature_is_bad_encoding() {
        let key = test_key(7);
        let digest = dhash(b"message");
        assert_eq!(
            verify_digest(&key.public_key(), &digest, &[0u8; 8]),
            Err(CryptoError::BadSignatureEncoding)
        );
    }

    #[test]
    fn test_public_key_prefix_check() {
        assert!(PublicKey::from_bytes([0x02; 33]).is_ok());
        let mut bytes = [0u8; 33];
        bytes[0] = 0x04;
        assert_eq!(PublicKey::from_bytes(bytes), Err(DecodeError::BadPublicKey));
        assert_eq!(PublicKey::from_slice(&[0x02; 20]), Err(DecodeError::BadPublicKey));
    }

    #[test]
    fn test_public_key_hex_round_trip() {
        let pubkey = test_key(3).public_key();
        assert_eq!(PublicKey::from_hex(&pubkey.to_hex()).unwrap(), pubkey);
    }

    #[test]
    fn test_private_key_rejects_zero() {
        assert_eq!(
            PrivateKey::from_bytes(&[0u8; 32]),
            Err(CryptoError::BadPrivateKey)
        );
    }
}
