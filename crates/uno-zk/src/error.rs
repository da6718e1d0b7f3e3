//! error types for uno-zk

use thiserror::Error;

use crate::verifier::VerifierError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // === identity errors (fatal input) ===
    #[error("invalid card: color {color}, type {card_type}, copy {copy_index}")]
    InvalidCard {
        color: u8,
        card_type: u8,
        copy_index: u8,
    },

    #[error("unknown card code: {0:?}")]
    UnknownCardCode(String),

    // === state errors ===
    #[error("no zk state loaded for game {0}")]
    GameNotFound(String),

    #[error("deck position {position} out of range (deck has {len} cards)")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("card at deck position {0} already consumed")]
    AlreadyConsumed(usize),

    #[error("too many leaves: {got} (tree holds {max})")]
    TooManyLeaves { got: usize, max: usize },

    #[error("snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    #[error("invalid field encoding: {0}")]
    Field(#[from] FieldParseError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // === proof runtime errors ===
    #[error("circuit {circuit} failed to load: {reason}")]
    CircuitLoad { circuit: String, reason: String },

    #[error("proof generation for {circuit} failed: {reason}")]
    ProofGeneration { circuit: String, reason: String },

    #[error("aggregation timed out after {attempts} polls")]
    AggregationTimeout { attempts: u32 },

    #[error("aggregation rejected proof: {0}")]
    AggregationRejected(String),

    #[error("network error: {0}")]
    Network(String),

    // === on-chain ===
    #[error("verifier error: {0}")]
    Verifier(#[from] VerifierError),

    // === plumbing ===
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// strict field parse failure, see [`crate::field::parse_hex_field`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldParseError {
    #[error("empty field encoding")]
    Empty,

    #[error("non-hex character in {0:?}")]
    InvalidHex(String),

    #[error("non-decimal character in {0:?}")]
    InvalidDecimal(String),

    #[error("encoding wider than 32 bytes: {0} hex chars")]
    TooWide(usize),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}
