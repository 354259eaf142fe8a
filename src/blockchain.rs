//! The chain-state engine.
//!
//! Blocks form a tree rooted at the null hash; the branch with the most
//! cumulative work is the active chain, and the pixel map is its fold.
//! Proposing a block validates it against the current pixel map, records
//! its work, and when it outweighs the tip, reorganizes: the old branch is
//! unconfirmed down to the common ancestor, then the new branch is
//! confirmed on top of it. The pixel map mutates exactly once per
//! transition, so it always reflects the active chain and nothing else.
//!
//! The engine is a single-writer state machine. Mutating entry points must
//! be externally serialized; reorgs run to completion or abort the process,
//! so a partially applied reorg is never observable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::constants::{MAX_REWIND, NULL_HASH};
use crate::error::{BlockError, ChainError, Result, TransactionError};
use crate::store::{BlockStore, MemoryBlockStore, MemoryTransactionStore, TransactionStore};
use crate::transaction::Transaction;
use crate::types::{display_hash, Hash, Position};
use crate::work::{block_work, U256};

/// Observer for chain-state transitions.
///
/// Callbacks fire after the corresponding state mutation has completed,
/// unconfirms tip-down and confirms root-up. Listeners must not call back
/// into the engine's mutation paths.
pub trait ChainListener {
    fn on_confirm(&mut self, block: &Block);
    fn on_unconfirm(&mut self, block: &Block);
}

/// Outcome of a block proposal: the hashes removed from and added to the
/// active chain, in transition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalResult {
    pub unconfirmed: Vec<Hash>,
    pub confirmed: Vec<Hash>,
}

impl ProposalResult {
    /// True when the proposal left the active chain untouched
    pub fn is_noop(&self) -> bool {
        self.unconfirmed.is_empty() && self.confirmed.is_empty()
    }
}

/// All chain index maps, owned together so they can only mutate in step.
///
/// `prev` and `work` cover every admitted block and persist; `height`,
/// `next`, `hash_by_height` and `pixels` are defined exactly for the
/// active chain and change only inside confirm and unconfirm.
#[derive(Debug, Clone)]
pub struct ChainIndex {
    work: HashMap<Hash, U256>,
    prev: HashMap<Hash, Hash>,
    height: HashMap<Hash, i64>,
    next: HashMap<Hash, Hash>,
    hash_by_height: HashMap<i64, Hash>,
    tip: Hash,
    pixels: HashMap<Position, Transaction>,
}

impl ChainIndex {
    pub fn new() -> Self {
        let mut work = HashMap::new();
        work.insert(NULL_HASH, U256::ZERO);
        let mut height = HashMap::new();
        height.insert(NULL_HASH, -1);
        Self {
            work,
            prev: HashMap::new(),
            height,
            next: HashMap::new(),
            hash_by_height: HashMap::new(),
            tip: NULL_HASH,
            pixels: HashMap::new(),
        }
    }

    pub fn tip(&self) -> Hash {
        self.tip
    }

    pub fn work_of(&self, hash: &Hash) -> Option<U256> {
        self.work.get(hash).copied()
    }

    pub fn height_of(&self, hash: &Hash) -> Option<i64> {
        self.height.get(hash).copied()
    }

    pub fn hash_at_height(&self, height: i64) -> Option<Hash> {
        self.hash_by_height.get(&height).copied()
    }
}

impl Default for ChainIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of the chain index maps (not the stores).
///
/// `active` lists the active-chain hashes from height 0 upward; `next`,
/// `height` and `hash_by_height` are rebuilt from it on restore. `work`
/// and `prev` entries are sorted by hash for a stable field order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub tip: Hash,
    pub work: Vec<(Hash, U256)>,
    pub prev: Vec<(Hash, Hash)>,
    pub active: Vec<Hash>,
    pub pixels: Vec<Transaction>,
}

/// Reorg-aware block-tree engine projecting the active chain onto a pixel
/// map.
///
/// ```
/// use pixelchain::Blockchain;
///
/// let mut chain = Blockchain::new();
/// chain.bootstrap().unwrap();
/// assert_eq!(chain.get_current_height(), 0);
/// ```
pub struct Blockchain<B = MemoryBlockStore, T = MemoryTransactionStore> {
    index: ChainIndex,
    blocks: B,
    transactions: T,
    listeners: Vec<Box<dyn ChainListener>>,
}

impl Blockchain<MemoryBlockStore, MemoryTransactionStore> {
    /// Engine backed by in-memory stores
    pub fn new() -> Self {
        Self::with_stores(MemoryBlockStore::new(), MemoryTransactionStore::new())
    }
}

impl Default for Blockchain<MemoryBlockStore, MemoryTransactionStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BlockStore, T: TransactionStore> Blockchain<B, T> {
    pub fn with_stores(blocks: B, transactions: T) -> Self {
        Self {
            index: ChainIndex::new(),
            blocks,
            transactions,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn ChainListener>) {
        self.listeners.push(listener);
    }

    pub fn index(&self) -> &ChainIndex {
        &self.index
    }

    /// Propose the fixed genesis block on a fresh engine.
    pub fn bootstrap(&mut self) -> Result<ProposalResult> {
        self.propose_new_block(&Block::genesis())
    }

    /// True when the block's work is known to the tree
    pub fn has_data(&self, hash: &Hash) -> bool {
        self.index.work.contains_key(hash)
    }

    /// Height of the active tip, -1 on an empty chain
    pub fn get_current_height(&self) -> i64 {
        self.index.height.get(&self.index.tip).copied().unwrap_or(-1)
    }

    pub fn tip(&self) -> Hash {
        self.index.tip
    }

    pub fn get_block(&self, hash: &Hash) -> Option<Block> {
        self.blocks.get(hash)
    }

    pub fn get_tip_block(&self) -> Option<Block> {
        if self.index.tip == NULL_HASH {
            return None;
        }
        self.blocks.get(&self.index.tip)
    }

    pub fn get_transaction(&self, hash: &Hash) -> Option<Transaction> {
        self.transactions.get(hash)
    }

    /// Transaction currently holding the pixel on the active chain
    pub fn pixel_at(&self, position: &Position) -> Option<&Transaction> {
        self.index.pixels.get(position)
    }

    pub fn pixel_count(&self) -> usize {
        self.index.pixels.len()
    }

    pub fn work_of(&self, hash: &Hash) -> Option<U256> {
        self.index.work_of(hash)
    }

    pub fn hash_at_height(&self, height: i64) -> Option<Hash> {
        self.index.hash_at_height(height)
    }

    /// Validate and admit a candidate block, reorganizing when it makes the
    /// heaviest chain.
    ///
    /// Returns the hashes unconfirmed from the old branch (tip first) and
    /// confirmed on the new one (root first); both lists are empty when the
    /// block lands on a side branch. Re-proposing a known block is a no-op.
    pub fn propose_new_block(&mut self, block: &Block) -> Result<ProposalResult> {
        let hash = block.hash();
        if self.has_data(&hash) {
            debug!(block = %display_hash(&hash), "proposed block already known");
            return Ok(ProposalResult::default());
        }

        if let Err(error) = self.check_valid_block(block) {
            warn!(block = %display_hash(&hash), %error, "rejected block");
            return Err(error);
        }

        self.blocks.set(block.clone());
        for tx in &block.transactions {
            self.transactions.set(tx.clone());
        }

        let prev = block.header.prev_hash;
        let parent_work = self
            .index
            .work
            .get(&prev)
            .copied()
            .ok_or_else(|| ChainError::UnknownParent(display_hash(&prev)))?;
        let cumulative = parent_work.saturating_add(&block_work(block.header.bits));
        self.index.prev.insert(hash, prev);
        self.index.work.insert(hash, cumulative);

        let tip_work = self
            .index
            .work
            .get(&self.index.tip)
            .copied()
            .unwrap_or(U256::ZERO);
        if cumulative > tip_work {
            self.append_new_block(&hash)
        } else {
            debug!(block = %display_hash(&hash), "admitted to side branch");
            Ok(ProposalResult::default())
        }
    }

    pub fn is_valid_block(&self, block: &Block) -> bool {
        self.check_valid_block(block).is_ok()
    }

    /// Full validity check against the current pixel map and block tree.
    ///
    /// Structural consistency first, then chain rules: the parent's work
    /// must be known, the coinbase must mint an unmined pixel adjacent to a
    /// mined one (genesis excepted), and every transfer must be signed by
    /// the pixel's previous holder, resolved through earlier transactions
    /// in the same block before the live pixel map.
    pub fn check_valid_block(&self, block: &Block) -> Result<()> {
        block.check().map_err(ChainError::from)?;

        if !self.has_data(&block.header.prev_hash) {
            return Err(ChainError::UnknownParent(display_hash(
                &block.header.prev_hash,
            )));
        }

        let coinbase = &block.transactions[0];
        if self.index.pixels.contains_key(&coinbase.position) {
            return Err(ChainError::PixelAlreadyMined(coinbase.position));
        }
        // Only a true bootstrap block (height 0 on the null parent) is
        // exempt from adjacency
        let is_bootstrap = block.header.height == 0 && block.header.prev_hash == NULL_HASH;
        if !is_bootstrap {
            let minted: Vec<Position> = self.index.pixels.keys().copied().collect();
            if coinbase.first_adjacent(&minted).is_none() {
                return Err(ChainError::NonAdjacentCoinbase(coinbase.position));
            }
        }

        // Track in-block spends so later transfers chain onto earlier ones
        let mut scratch: HashMap<Position, &Transaction> = HashMap::new();
        scratch.insert(coinbase.position, coinbase);
        for tx in &block.transactions[1..] {
            if tx.is_coinbase() {
                return Err(BlockError::CoinbaseNotFirst.into());
            }
            let previous = match scratch.get(&tx.position) {
                Some(previous) => *previous,
                None => self
                    .index
                    .pixels
                    .get(&tx.position)
                    .ok_or_else(|| TransactionError::MissingPreviousTx(tx.id()))?,
            };
            if tx.input != previous.hash() {
                return Err(TransactionError::MissingPreviousTx(tx.id()).into());
            }
            match tx.is_valid_signature(&previous.owner) {
                Ok(true) => {}
                Ok(false) => return Err(ChainError::SignatureMismatch(tx.id())),
                Err(error) => return Err(error.into()),
            }
            scratch.insert(tx.position, tx);
        }
        Ok(())
    }

    /// Make the given block the new tip.
    ///
    /// Walks the new branch back to the first block that already has a
    /// height assignment (the common ancestor), unconfirms the old branch
    /// down to it, then confirms the new branch on top.
    fn append_new_block(&mut self, hash: &Hash) -> Result<ProposalResult> {
        let mut to_confirm: Vec<Hash> = Vec::new();
        let mut cursor = *hash;
        while !self.index.height.contains_key(&cursor) {
            to_confirm.push(cursor);
            cursor = self
                .index
                .prev
                .get(&cursor)
                .copied()
                .ok_or_else(|| ChainError::UnknownParent(display_hash(&cursor)))?;
        }

        let mut to_unconfirm: Vec<Hash> = Vec::new();
        let mut old = self.index.tip;
        while old != cursor {
            to_unconfirm.push(old);
            old = self
                .index
                .prev
                .get(&old)
                .copied()
                .ok_or_else(|| ChainError::UnknownParent(display_hash(&old)))?;
        }

        if to_unconfirm.len() > MAX_REWIND {
            warn!(
                depth = to_unconfirm.len(),
                "refusing reorg past the rewind limit"
            );
            return Err(ChainError::ReorgTooDeep(to_unconfirm.len()));
        }

        if !to_unconfirm.is_empty() {
            info!(
                unconfirming = to_unconfirm.len(),
                confirming = to_confirm.len(),
                ancestor = %display_hash(&cursor),
                "reorganizing chain"
            );
        }

        for hash in &to_unconfirm {
            let block = self
                .blocks
                .get(hash)
                .unwrap_or_else(|| panic!("block {} missing from store", display_hash(hash)));
            if let Err(error) = self.unconfirm(&block) {
                panic!("reorg invariant violated: {error}");
            }
        }
        to_confirm.reverse();
        for hash in &to_confirm {
            let block = self
                .blocks
                .get(hash)
                .unwrap_or_else(|| panic!("block {} missing from store", display_hash(hash)));
            if let Err(error) = self.confirm(&block) {
                panic!("reorg invariant violated: {error}");
            }
        }

        info!(
            height = self.get_current_height(),
            tip = %display_hash(&self.index.tip),
            "chain tip advanced"
        );
        Ok(ProposalResult {
            unconfirmed: to_unconfirm,
            confirmed: to_confirm,
        })
    }

    /// Extend the active chain by one block. The block's parent must be the
    /// current tip.
    pub fn confirm(&mut self, block: &Block) -> Result<()> {
        let hash = block.hash();
        if block.header.prev_hash != self.index.tip {
            return Err(ChainError::NonContiguousConfirm(display_hash(&hash)));
        }
        let height = self
            .index
            .height
            .get(&self.index.tip)
            .copied()
            .unwrap_or(-1)
            + 1;

        self.index.next.insert(self.index.tip, hash);
        self.index.tip = hash;
        self.index.height.insert(hash, height);
        self.index.hash_by_height.insert(height, hash);
        for tx in &block.transactions {
            self.index.pixels.insert(tx.position, tx.clone());
        }

        debug!(height, block = %display_hash(&hash), "confirmed block");
        for listener in &mut self.listeners {
            listener.on_confirm(block);
        }
        Ok(())
    }

    /// Retract the active tip. The pixel map is restored by re-resolving
    /// each transaction's input through the transaction store, newest
    /// first; coinbase pixels are deleted outright.
    pub fn unconfirm(&mut self, block: &Block) -> Result<()> {
        let hash = block.hash();
        if hash != self.index.tip {
            return Err(ChainError::NonTipUnconfirm(display_hash(&hash)));
        }
        let prev = self
            .index
            .prev
            .get(&hash)
            .copied()
            .ok_or_else(|| ChainError::UnknownParent(display_hash(&hash)))?;
        let height = match self.index.height.remove(&hash) {
            Some(height) => height,
            None => panic!("active tip {} has no height", display_hash(&hash)),
        };

        self.index.hash_by_height.remove(&height);
        self.index.next.remove(&prev);
        self.index.tip = prev;

        for tx in block.transactions.iter().rev() {
            if tx.is_coinbase() {
                self.index.pixels.remove(&tx.position);
            } else {
                let previous = self.transactions.get(&tx.input).unwrap_or_else(|| {
                    panic!(
                        "previous transaction {} missing from store",
                        display_hash(&tx.input)
                    )
                });
                self.index.pixels.insert(previous.position, previous);
            }
        }

        debug!(height, block = %display_hash(&hash), "unconfirmed block");
        for listener in &mut self.listeners {
            listener.on_unconfirm(block);
        }
        Ok(())
    }

    /// Hashes describing the active chain for ancestor negotiation: the 10
    /// most recent, then exponentially sparser samples down to genesis.
    pub fn get_block_locator(&self) -> Vec<Hash> {
        let mut locator = Vec::new();
        let tip_height = self.get_current_height();
        if tip_height < 0 {
            return locator;
        }
        let mut height = tip_height;
        let mut step: i64 = 1;
        while height > 0 {
            locator.push(self.index.hash_by_height[&height]);
            if locator.len() >= 10 {
                step *= 2;
            }
            height -= step;
        }
        locator.push(self.index.hash_by_height[&0]);
        locator
    }

    /// Discard side-branch tree entries whose fork point has fallen out of
    /// the rewind window; reorgs onto them would be refused anyway.
    pub fn prune(&mut self) {
        let keep_floor = self.get_current_height() - MAX_REWIND as i64;
        let known: Vec<Hash> = self.index.work.keys().copied().collect();
        let mut removed = 0usize;
        for hash in known {
            if self.index.height.contains_key(&hash) {
                continue;
            }
            let mut cursor = hash;
            let fork_height = loop {
                if let Some(height) = self.index.height.get(&cursor) {
                    break *height;
                }
                match self.index.prev.get(&cursor) {
                    Some(parent) => cursor = *parent,
                    // Ancestry already pruned away
                    None => break i64::MIN,
                }
            };
            if fork_height < keep_floor {
                self.index.work.remove(&hash);
                self.index.prev.remove(&hash);
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "pruned stale fork entries");
        }
    }

    /// Capture the index maps for persistence or transfer. Stores are not
    /// included.
    pub fn snapshot(&self) -> ChainSnapshot {
        let mut work: Vec<(Hash, U256)> = self
            .index
            .work
            .iter()
            .filter(|(hash, _)| **hash != NULL_HASH)
            .map(|(hash, work)| (*hash, *work))
            .collect();
        work.sort_by(|a, b| a.0.cmp(&b.0));

        let mut prev: Vec<(Hash, Hash)> = self
            .index
            .prev
            .iter()
            .map(|(hash, parent)| (*hash, *parent))
            .collect();
        prev.sort_by(|a, b| a.0.cmp(&b.0));

        let mut active = Vec::new();
        for height in 0..=self.get_current_height() {
            active.push(self.index.hash_by_height[&height]);
        }

        let mut pixels: Vec<Transaction> = self.index.pixels.values().cloned().collect();
        pixels.sort_by_key(|tx| (tx.position.x, tx.position.y));

        ChainSnapshot {
            tip: self.index.tip,
            work,
            prev,
            active,
            pixels,
        }
    }

    /// Replace the index maps with a previously captured snapshot.
    pub fn restore(&mut self, snapshot: ChainSnapshot) {
        let mut index = ChainIndex::new();
        for (hash, work) in snapshot.work {
            index.work.insert(hash, work);
        }
        for (hash, parent) in snapshot.prev {
            index.prev.insert(hash, parent);
        }
        let mut parent = NULL_HASH;
        for (height, hash) in snapshot.active.iter().enumerate() {
            index.height.insert(*hash, height as i64);
            index.hash_by_height.insert(height as i64, *hash);
            index.next.insert(parent, *hash);
            parent = *hash;
        }
        index.tip = snapshot.tip;
        for tx in snapshot.pixels {
            index.pixels.insert(tx.position, tx);
        }
        self.index = index;
    }
}
