//! Core types for the pixel chain.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DecodeError;

/// Hash type: 256-bit hash in internal (little-endian) byte order
pub type Hash = [u8; 32];

/// Pixel color, interpreted as 0xRRGGBBAA
pub type Color = u32;

/// A pixel coordinate on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another position
    pub fn manhattan_distance(&self, other: &Position) -> u64 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        dx + dy
    }

    /// True when the other position is at Manhattan distance exactly 1
    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Render a hash in its display form: big-endian hex.
///
/// Hashes are stored and serialized little-endian; external identifiers
/// reverse the bytes before hex-encoding, as Bitcoin does.
pub fn display_hash(hash: &Hash) -> String {
    let mut bytes = *hash;
    bytes.reverse();
    hex::encode(bytes)
}

/// Parse a display-form (big-endian hex) hash back into internal byte order.
pub fn hash_from_display(s: &str) -> Result<Hash, DecodeError> {
    let decoded = hex::decode(s).map_err(|_| DecodeError::BadHex)?;
    if decoded.len() != 32 {
        return Err(DecodeError::BadHex);
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&decoded);
    hash.reverse();
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_distance() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.manhattan_distance(&Position::new(0, 0)), 0);
        assert_eq!(origin.manhattan_distance(&Position::new(1, 0)), 1);
        assert_eq!(origin.manhattan_distance(&Position::new(-1, 0)), 1);
        assert_eq!(origin.manhattan_distance(&Position::new(3, -4)), 7);
    }

    #[test]
    fn test_is_adjacent() {
        let origin = Position::new(0, 0);
        assert!(origin.is_adjacent(&Position::new(1, 0)));
        assert!(origin.is_adjacent(&Position::new(0, -1)));
        assert!(!origin.is_adjacent(&Position::new(0, 0)));
        assert!(!origin.is_adjacent(&Position::new(1, 1)));
        assert!(!origin.is_adjacent(&Position::new(2, 0)));
    }

    #[test]
    fn test_manhattan_distance_extreme_coordinates() {
        let a = Position::new(i32::MIN, i32::MIN);
        let b = Position::new(i32::MAX, i32::MAX);
        // Distances are computed in 64-bit space, no overflow
        assert_eq!(a.manhattan_distance(&b), 2 * (u32::MAX as u64));
    }

    #[test]
    fn test_display_hash_reverses_bytes() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        hash[31] = 0x01;
        let display = display_hash(&hash);
        assert!(display.starts_with("01"));
        assert!(display.ends_with("ab"));
        assert_eq!(display.len(), 64);
    }

    #[test]
    fn test_hash_from_display_round_trip() {
        let mut hash = [0u8; 32];
        for (i, byte) in hash.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let display = display_hash(&hash);
        assert_eq!(hash_from_display(&display).unwrap(), hash);
    }

    #[test]
    fn test_hash_from_display_rejects_bad_input() {
        assert_eq!(hash_from_display("zz"), Err(DecodeError::BadHex));
        assert_eq!(hash_from_display("abcd"), Err(DecodeError::BadHex));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(-3, 7).to_string(), "(-3, 7)");
    }
}
