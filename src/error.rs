//! Error types for the pixel chain

use thiserror::Error;

use crate::types::Position;

/// Wire decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("truncated input: wanted {wanted} bytes, {remaining} remain")]
    TruncatedInput { wanted: usize, remaining: usize },

    #[error("non-canonical variable-length count")]
    BadVarInt,

    #[error("malformed public key")]
    BadPublicKey,

    #[error("malformed hex input")]
    BadHex,
}

/// Failures in the signature primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signature bytes are not valid DER")]
    BadSignatureEncoding,

    #[error("private key is out of range")]
    BadPrivateKey,
}

/// Transaction-level validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction is not signed")]
    MissingSignatures,

    #[error("undecodable signature on transaction {0}")]
    InvalidSignature(String),

    #[error("no matching previous transaction for {0}")]
    MissingPreviousTx(String),

    #[error("invalid color {0:#010x}")]
    InvalidColor(u32),

    #[error("position is already fixed by the spent transaction")]
    PositionConflict,

    #[error("transaction draft is missing its {0}")]
    IncompleteDraft(&'static str),
}

/// Block-level structural failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("merkle root does not match transactions")]
    InvalidMerkleRoot,

    #[error("block has no transactions")]
    EmptyTransactions,

    #[error("first transaction is not a coinbase")]
    CoinbaseNotFirst,

    #[error("serialized block is {0} bytes, above the size limit")]
    OversizeBlock(usize),
}

/// Failures surfaced by the chain engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("unknown parent block {0}")]
    UnknownParent(String),

    #[error("coinbase pixel {0} is not adjacent to any mined pixel")]
    NonAdjacentCoinbase(Position),

    #[error("pixel {0} is already mined")]
    PixelAlreadyMined(Position),

    #[error("signature mismatch in transaction {0}")]
    SignatureMismatch(String),

    #[error("confirm out of order for block {0}")]
    NonContiguousConfirm(String),

    #[error("unconfirm of non-tip block {0}")]
    NonTipUnconfirm(String),

    #[error("reorg of depth {0} exceeds the rewind limit")]
    ReorgTooDeep(usize),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

pub type Result<T> = std::result::Result<T, ChainError>;
