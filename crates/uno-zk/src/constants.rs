//! circuit-facing constants
//!
//! every value here is mirrored by the external circuits. changing one
//! changes roots, commitments and bitset digests.

/// physical cards in a deck
pub const DECK_SIZE: usize = 108;

/// fixed depth of the deck commitment tree and of every merkle path
pub const TREE_DEPTH: usize = 7;

/// leaves in the padded deck tree (2^TREE_DEPTH)
pub const TREE_WIDTH: usize = 1 << TREE_DEPTH;

/// bits folded into one bitset chunk hash
pub const BITSET_CHUNK_BITS: usize = 16;

/// chunks covering DECK_SIZE bits, last one zero padded
pub const BITSET_CHUNKS: usize = DECK_SIZE.div_ceil(BITSET_CHUNK_BITS);

/// domain tag for H4(tag, color, type, copy)
pub const DOMAIN_CARD_UID: u64 = 1;

/// domain tag for H3(tag, uid, nonce)
pub const DOMAIN_CARD_COMMITMENT: u64 = 2;

/// domain tag for bitset chunk accumulation and chunk hashing
pub const DOMAIN_BITSET_COMPRESS: u64 = 3;

/// random bytes drawn per nonce before reduction
pub const NONCE_BYTES: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(TREE_WIDTH, 128);
        assert_eq!(BITSET_CHUNKS, 7);
        assert!(DECK_SIZE <= TREE_WIDTH);
        assert!(BITSET_CHUNKS * BITSET_CHUNK_BITS >= DECK_SIZE);
    }
}
