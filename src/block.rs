//! Blocks and block headers.
//!
//! A block is a fixed 84-byte header followed by a CompactSize-counted list
//! of transactions, the first of which mints the block's pixel. The header
//! commits to the transaction list through a Bitcoin-style Merkle root.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::{Reader, Writer};
use crate::constants::{
    CURRENT_VERSION, GENESIS_BITS, GENESIS_COLOR, GENESIS_NONCE, GENESIS_OWNER, GENESIS_TIME,
    MAX_BLOCK_SIZE, MAX_TIME_OFFSET, NULL_HASH,
};
use crate::crypto::{dhash, PublicKey};
use crate::error::{BlockError, DecodeError};
use crate::transaction::Transaction;
use crate::types::{display_hash, Hash, Position};
use crate::work::{expand_target, hash_meets_target, U256};

/// Fixed-size block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub height: u32,
    pub time: u32,
    pub bits: u32,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialized header length in bytes
    pub const SERIALIZED_LEN: usize = 84;

    pub fn encode_into(&self, writer: &mut Writer) {
        writer.write_u32_le(self.version);
        writer.write_u32_le(self.height);
        writer.write_u32_le(self.time);
        writer.write_u32_le(self.bits);
        writer.write_hash(&self.prev_hash);
        writer.write_hash(&self.merkle_root);
        writer.write_u32_le(self.nonce);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode_into(&mut writer);
        writer.into_bytes()
    }

    pub fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            version: reader.read_u32_le()?,
            height: reader.read_u32_le()?,
            time: reader.read_u32_le()?,
            bits: reader.read_u32_le()?,
            prev_hash: reader.read_hash()?,
            merkle_root: reader.read_hash()?,
            nonce: reader.read_u32_le()?,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        Self::decode_from(&mut reader)
    }

    /// Identity hash of the header, internal byte order
    pub fn hash(&self) -> Hash {
        dhash(&self.to_bytes())
    }

    pub fn id(&self) -> String {
        display_hash(&self.hash())
    }

    /// Expanded difficulty target, `None` when `bits` is undecodable
    pub fn target_difficulty(&self) -> Option<U256> {
        expand_target(self.bits)
    }

    /// True when the header hash, read big-endian, is at or below the target
    pub fn valid_proof_of_work(&self) -> bool {
        match self.target_difficulty() {
            Some(target) => hash_meets_target(&self.hash(), &target),
            None => false,
        }
    }

    pub fn valid_timestamp(&self) -> bool {
        self.valid_timestamp_at(unix_time())
    }

    /// Reject timestamps more than `MAX_TIME_OFFSET` ahead of `now`.
    pub fn valid_timestamp_at(&self, now: u32) -> bool {
        self.time <= now.saturating_add(MAX_TIME_OFFSET)
    }

    /// Step the nonce while grinding for a proof of work.
    pub fn increase_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
    }
}

/// A header plus its ordered transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The fixed first block of the chain
    pub fn genesis() -> Self {
        let coinbase = Transaction {
            version: CURRENT_VERSION,
            input: NULL_HASH,
            position: Position::new(0, 0),
            color: GENESIS_COLOR,
            owner: PublicKey::from_bytes(GENESIS_OWNER).expect("genesis owner key is well-formed"),
            signature: None,
        };
        let header = BlockHeader {
            version: CURRENT_VERSION as u32,
            height: 0,
            time: GENESIS_TIME,
            bits: GENESIS_BITS,
            prev_hash: NULL_HASH,
            merkle_root: NULL_HASH,
            nonce: GENESIS_NONCE,
        };
        let mut block = Block {
            header,
            transactions: Vec::new(),
        };
        block.add_transaction(coinbase);
        block
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn id(&self) -> String {
        self.header.id()
    }

    /// Merkle root over the transaction identity hashes.
    ///
    /// An empty list yields the all-zero root; a level with an odd count
    /// pairs its last node with itself, as Bitcoin does.
    pub fn merkle_root(&self) -> Hash {
        let hashes: Vec<Hash> = self.transactions.iter().map(|tx| tx.hash()).collect();
        compute_merkle_root(&hashes)
    }

    pub fn valid_merkle_root(&self) -> bool {
        self.header.merkle_root == self.merkle_root()
    }

    /// Append a transaction and recommit the header to the new list.
    ///
    /// Miner-side convenience, not a consensus path.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
        self.header.merkle_root = self.merkle_root();
    }

    pub fn encode_into(&self, writer: &mut Writer) {
        self.header.encode_into(writer);
        writer.write_varint(self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.encode_into(writer, true);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode_into(&mut writer);
        writer.into_bytes()
    }

    pub fn serialized_size(&self) -> usize {
        self.to_bytes().len()
    }

    pub fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let header = BlockHeader::decode_from(reader)?;
        let count = reader.read_varint()?;
        let mut transactions = Vec::new();
        for _ in 0..count {
            transactions.push(Transaction::decode_from(reader)?);
        }
        Ok(Self {
            header,
            transactions,
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

    /// Structural self-consistency: transactions present, coinbase first,
    /// header committed to the list, size within bounds.
    pub fn check(&self) -> Result<(), BlockError> {
        if self.transactions.is_empty() {
            return Err(BlockError::EmptyTransactions);
        }
        if !self.transactions[0].is_coinbase() {
            return Err(BlockError::CoinbaseNotFirst);
        }
        if !self.valid_merkle_root() {
            return Err(BlockError::InvalidMerkleRoot);
        }
        let size = self.serialized_size();
        if size > MAX_BLOCK_SIZE {
            return Err(BlockError::OversizeBlock(size));
        }
        Ok(())
    }
}

/// Reduce a list of hashes to its Merkle root.
pub fn compute_merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return NULL_HASH;
    }
    let mut level = hashes.to_vec();
    while level.len() > 1 {
        level = merkle_parent_level(&level);
    }
    level[0]
}

fn merkle_parent_level(nodes: &[Hash]) -> Vec<Hash> {
    let mut parents = Vec::with_capacity((nodes.len() + 1) / 2);
    let mut index = 0;
    while index < nodes.len() {
        let left = nodes[index];
        let right = nodes[usize::min(index + 1, nodes.len() - 1)];
        let mut concat = [0u8; 64];
        concat[..32].copy_from_slice(&left);
        concat[32..].copy_from_slice(&right);
        parents.push(dhash(&concat));
        index += 2;
    }
    parents
}

fn unix_time() -> u32 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as u32,
        Err(_) => 0,
    }
}
