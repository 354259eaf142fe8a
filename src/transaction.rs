//! Pixel-transfer transactions.
//!
//! A transaction either mints a pixel (a coinbase, whose `input` is the
//! all-zero hash) or transfers one, in which case `input` names the hash of
//! the transaction that last held the pixel and `signature` must verify
//! against that holder's public key. Exactly one pixel moves per
//! transaction.
//!
//! Wire layout, little-endian where applicable:
//!
//! ```text
//! u8 version | [32] input | i32 x | i32 y | u32 color | [33] owner
//!            | u8 sig_len | [sig_len] signature
//! ```

use serde::{Deserialize, Serialize};

use crate::codec::{Reader, Writer};
use crate::constants::{CURRENT_VERSION, MAX_SIGNATURE_LEN, NULL_HASH};
use crate::crypto::{self, PrivateKey, PublicKey};
use crate::error::{CryptoError, DecodeError, TransactionError};
use crate::types::{Color, Hash, Position};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u8,
    /// Hash of the previous transaction holding this pixel; all zeroes on a
    /// coinbase
    pub input: Hash,
    pub position: Position,
    pub color: Color,
    /// Public key of the new holder
    pub owner: PublicKey,
    /// DER signature by the previous holder; absent on coinbase or drafts
    pub signature: Option<Vec<u8>>,
}

impl Transaction {
    pub fn encode_into(&self, writer: &mut Writer, include_signature: bool) {
        writer.write_u8(self.version);
        writer.write_hash(&self.input);
        writer.write_i32_le(self.position.x);
        writer.write_i32_le(self.position.y);
        writer.write_u32_le(self.color);
        writer.write_bytes(self.owner.as_bytes());
        match &self.signature {
            Some(signature) if include_signature => {
                // The length prefix is a single byte; a longer signature
                // cannot be framed and must not reach the wire
                assert!(
                    signature.len() <= MAX_SIGNATURE_LEN,
                    "signature length {} exceeds the wire limit",
                    signature.len()
                );
                writer.write_u8(signature.len() as u8);
                writer.write_bytes(signature);
            }
            _ => writer.write_u8(0),
        }
    }

    /// Full serialization, signature included
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode_into(&mut writer, true);
        writer.into_bytes()
    }

    /// The signed preimage: the serialization with a zero signature length
    pub fn sighash(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode_into(&mut writer, false);
        writer.into_bytes()
    }

    pub fn sighash_digest(&self) -> Hash {
        crypto::dhash(&self.sighash())
    }

    pub fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = reader.read_u8()?;
        let input = reader.read_hash()?;
        let x = reader.read_i32_le()?;
        let y = reader.read_i32_le()?;
        let color = reader.read_u32_le()?;
        let owner = PublicKey::from_slice(reader.read_bytes(crate::constants::PUBLIC_KEY_LEN)?)?;
        let sig_len = reader.read_u8()? as usize;
        let signature = if sig_len == 0 {
            None
        } else {
            Some(reader.read_bytes(sig_len)?.to_vec())
        };
        Ok(Self {
            version,
            input,
            position: Position::new(x, y),
            color,
            owner,
            signature,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        Self::decode_from(&mut reader)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(s).map_err(|_| DecodeError::BadHex)?;
        Self::from_bytes(&bytes)
    }

    /// Identity hash over the full serialization, internal byte order
    pub fn hash(&self) -> Hash {
        crypto::dhash(&self.to_bytes())
    }

    /// Display identifier: big-endian hex of the identity hash
    pub fn id(&self) -> String {
        crate::types::display_hash(&self.hash())
    }

    pub fn is_coinbase(&self) -> bool {
        self.input == NULL_HASH
    }

    /// Sign the pixel transfer with the previous holder's key.
    pub fn sign(&mut self, key: &PrivateKey) {
        self.signature = Some(crypto::sign_digest(key, &self.sighash_digest()));
    }

    /// Check the signature against the previous holder's public key.
    pub fn is_valid_signature(
        &self,
        previous_owner: &PublicKey,
    ) -> Result<bool, TransactionError> {
        let signature = self
            .signature
            .as_deref()
            .ok_or(TransactionError::MissingSignatures)?;
        match crypto::verify_digest(previous_owner, &self.sighash_digest(), signature) {
            Ok(valid) => Ok(valid),
            Err(CryptoError::BadSignatureEncoding) => {
                Err(TransactionError::InvalidSignature(self.id()))
            }
            Err(_) => Err(TransactionError::InvalidSignature(self.id())),
        }
    }

    /// First listed position at Manhattan distance exactly 1 from this
    /// transaction's pixel, if any.
    pub fn first_adjacent(&self, positions: &[Position]) -> Option<Position> {
        positions
            .iter()
            .find(|candidate| self.position.is_adjacent(candidate))
            .copied()
    }
}

/// Incremental construction of a pixel transfer.
///
/// `minting` starts a coinbase draft; `spending` chains onto the previous
/// holder, fixing both the input edge and the position. The two are
/// mutually exclusive.
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    input: Option<Hash>,
    position: Option<Position>,
    color: Option<Color>,
    owner: Option<PublicKey>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh pixel at the given coordinate.
    pub fn minting(mut self, x: i32, y: i32) -> Result<Self, TransactionError> {
        if self.input.is_some() {
            return Err(TransactionError::PositionConflict);
        }
        self.position = Some(Position::new(x, y));
        Ok(self)
    }

    /// Spend the pixel held by `previous`, inheriting its position.
    pub fn spending(mut self, previous: &Transaction) -> Result<Self, TransactionError> {
        if self.position.is_some() {
            return Err(TransactionError::PositionConflict);
        }
        self.input = Some(previous.hash());
        self.position = Some(previous.position);
        Ok(self)
    }

    /// Hand the pixel to a new holder.
    pub fn owned_by(mut self, owner: PublicKey) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Paint the pixel. Zero is reserved for "unset" and rejected.
    pub fn colored(mut self, color: Color) -> Result<Self, TransactionError> {
        if color == 0 {
            return Err(TransactionError::InvalidColor(color));
        }
        self.color = Some(color);
        Ok(self)
    }

    /// Produce the unsigned transaction.
    pub fn build(self) -> Result<Transaction, TransactionError> {
        let position = self
            .position
            .ok_or(TransactionError::IncompleteDraft("position"))?;
        let owner = self.owner.ok_or(TransactionError::IncompleteDraft("owner"))?;
        let color = self.color.ok_or(TransactionError::IncompleteDraft("color"))?;
        Ok(Transaction {
            version: CURRENT_VERSION,
            input: self.input.unwrap_or(NULL_HASH),
            position,
            color,
            owner,
            signature: None,
        })
    }
}
