//! Content-addressed block and transaction stores.
//!
//! The chain engine only ever looks objects up by hash, writes them once,
//! and asks whether a hash is present, so the store surface is exactly
//! those three operations. Backing the traits with a database or a network
//! fetch is a caller concern; the in-memory maps here cover tests and
//! single-process nodes.

use std::collections::HashMap;

use crate::block::Block;
use crate::transaction::Transaction;
use crate::types::Hash;

pub trait BlockStore {
    fn get(&self, hash: &Hash) -> Option<Block>;
    fn set(&mut self, block: Block);
    fn has(&self, hash: &Hash) -> bool;
}

pub trait TransactionStore {
    fn get(&self, hash: &Hash) -> Option<Transaction>;
    fn set(&mut self, tx: Transaction);
    fn has(&self, hash: &Hash) -> bool;
}

/// In-memory block store
#[derive(Debug, Default, Clone)]
pub struct MemoryBlockStore {
    blocks: HashMap<Hash, Block>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockStore for MemoryBlockStore {
    fn get(&self, hash: &Hash) -> Option<Block> {
        self.blocks.get(hash).cloned()
    }

    fn set(&mut self, block: Block) {
        self.blocks.insert(block.hash(), block);
    }

    fn has(&self, hash: &Hash) -> bool {
        self.blocks.contains_key(hash)
    }
}

/// In-memory transaction store
#[derive(Debug, Default, Clone)]
pub struct MemoryTransactionStore {
    transactions: HashMap<Hash, Transaction>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn get(&self, hash: &Hash) -> Option<Transaction> {
        self.transactions.get(hash).cloned()
    }

    fn set(&mut self, tx: Transaction) {
        self.transactions.insert(tx.hash(), tx);
    }

    fn has(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_store_round_trip() {
        let mut store = MemoryBlockStore::new();
        let genesis = Block::genesis();
        let hash = genesis.hash();

        assert!(!store.has(&hash));
        assert!(store.get(&hash).is_none());

        store.set(genesis.clone());
        assert!(store.has(&hash));
        assert_eq!(store.get(&hash), Some(genesis));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_block_store_set_is_idempotent() {
        let mut store = MemoryBlockStore::new();
        store.set(Block::genesis());
        store.set(Block::genesis());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_transaction_store_round_trip() {
        let mut store = MemoryTransactionStore::new();
        let coinbase = Block::genesis().transactions[0].clone();
        let hash = coinbase.hash();

        store.set(coinbase.clone());
        assert!(store.has(&hash));
        assert_eq!(store.get(&hash), Some(coinbase));
        assert!(!store.has(&[5u8; 32]));
    }
}
