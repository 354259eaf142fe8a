//! Chain consensus constants

use crate::types::{Color, Hash};

/// The all-zero hash, used as the coinbase input and the pre-genesis parent
pub const NULL_HASH: Hash = [0u8; 32];

/// Current transaction serialization version
pub const CURRENT_VERSION: u8 = 1;

/// Deepest reorganization the engine will perform
pub const MAX_REWIND: usize = 100;

/// Default compact difficulty target for newly mined blocks
pub const DEFAULT_BITS: u32 = 0x207f_ffff;

/// Maximum tolerated clock skew for block timestamps: 2 hours
pub const MAX_TIME_OFFSET: u32 = 7200;

/// Maximum serialized block size: 1MB
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Compressed public key length in bytes
pub const PUBLIC_KEY_LEN: usize = 33;

/// Longest signature the wire format can carry
pub const MAX_SIGNATURE_LEN: usize = 255;

/// Color of the genesis pixel
pub const GENESIS_COLOR: Color = 0x1337_1337;

/// Genesis block timestamp
pub const GENESIS_TIME: u32 = 1_433_037_823;

/// Genesis compact difficulty target
pub const GENESIS_BITS: u32 = 0x1e0f_ffff;

/// Genesis nonce
pub const GENESIS_NONCE: u32 = 586_081;

/// Compressed public key owning the genesis pixel
pub const GENESIS_OWNER: [u8; 33] = [
    0x03, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62,
    0x95, 0xce, 0x87, 0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28,
    0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
];
