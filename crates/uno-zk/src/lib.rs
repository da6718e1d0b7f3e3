//! uno-zk: card identity, deck commitments and merkle proof inputs for zk uno
//!
//! every physical card has a canonical poseidon uid. a shuffled deck is
//! committed card by card with fresh nonces, the commitments form a fixed
//! depth-7 merkle tree, and cards leaving the deck are tracked in a 108-bit
//! bitset whose digest chains draw proofs together.
//!
//! ```text
//! codes ──► cards ──► uid ──► commitment(uid, nonce) ──► merkle tree ──► root
//!                                                              │
//! consume_card ──► bitset transition + inclusion path ─────────┤
//!                                                              ▼
//!                     inputs (decimal) ──► prover ──► aggregation / verifier
//! ```
//!
//! all hashing is circom-compatible poseidon over the bn254 scalar field so
//! roots and digests match the external circuits bit for bit.

pub mod aggregation;
pub mod bitset;
pub mod cards;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod inputs;
pub mod merkle;
pub mod poseidon;
pub mod prover;
pub mod state;
pub mod store;
pub mod verifier;

pub use bitset::{BitsetTransition, ConsumedBitset};
pub use cards::{card_index, get_card_uid, Card, Color};
pub use commitment::{card_commitment, move_commitment};
pub use config::{Config, GameConfig};
pub use error::{Error, FieldParseError, Result};
pub use field::Fr;
pub use merkle::{hand_root, MerkleProof, MerkleTree};
pub use prover::{CircuitKind, HttpProvingBackend, ProofClient, ProofData, ProvingBackend};
pub use state::{CardInstance, ConsumeResult, GameSnapshot, GameZkState};
pub use store::GameStore;
pub use verifier::{VerifierClient, VerifierError, VerifyOutcome};
