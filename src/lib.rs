//! # Pixelchain
//!
//! A proof-of-work blockchain whose state is a 2-D grid of colored pixels.
//!
//! Each block extends the previous one and each transaction moves exactly
//! one pixel at an integer coordinate. Pixels carry a 32-bit RGBA color and
//! a public-key owner. A block is valid only if its coinbase mints a pixel
//! adjacent (Manhattan distance 1) to an already-mined one, and if every
//! other transaction carries a signature by the pixel's previous holder.
//!
//! This crate is the chain-state core: the reorg-aware block tree with
//! cumulative-work fork choice, the pixel map projected from the active
//! chain, the block and transaction wire codec, and the signature rules.
//! Peer exchange, mining loops and persistence live elsewhere and talk to
//! the engine through [`Blockchain`] and the store traits.
//!
//! ## Usage
//!
//! ```
//! use pixelchain::{Blockchain, Position};
//!
//! let mut chain = Blockchain::new();
//! chain.bootstrap().unwrap();
//!
//! assert_eq!(chain.get_current_height(), 0);
//! let pixel = chain.pixel_at(&Position::new(0, 0)).unwrap();
//! assert_eq!(pixel.color, pixelchain::GENESIS_COLOR);
//! ```

pub mod block;
pub mod blockchain;
pub mod codec;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod store;
pub mod transaction;
pub mod types;
pub mod work;

// Re-export commonly used types
pub use block::{Block, BlockHeader};
pub use blockchain::{Blockchain, ChainIndex, ChainListener, ChainSnapshot, ProposalResult};
pub use constants::*;
pub use crypto::{PrivateKey, PublicKey};
pub use error::{
    BlockError, ChainError, CryptoError, DecodeError, Result, TransactionError,
};
pub use store::{BlockStore, MemoryBlockStore, MemoryTransactionStore, TransactionStore};
pub use transaction::{Transaction, TransactionBuilder};
pub use types::{display_hash, hash_from_display, Color, Hash, Position};
