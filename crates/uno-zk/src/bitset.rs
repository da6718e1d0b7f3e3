//! consumed-card bitset and its circuit digest
//!
//! the digest is pinned to the verifier's arithmetic:
//!
//! ```text
//! chunk_hash(b0..b15) = H2(TAG, fold(TAG, |v, b| 2v + b))
//! compress(bits)      = H2(..H2(H2(c0, c1), c2).., c6)      left fold, not a balanced tree
//! ```
//!
//! the left fold mirrors the circuit's sequential accumulator. rebalancing
//! it changes every digest and breaks every draw proof.

use tracing::{debug, warn};

use crate::commitment::parent_hash;
use crate::constants::{BITSET_CHUNKS, BITSET_CHUNK_BITS, DECK_SIZE, DOMAIN_BITSET_COMPRESS};
use crate::error::{Error, Result};
use crate::field::Fr;
use crate::poseidon::hash2;

pub type Bits = [bool; DECK_SIZE];

/// hash one 16-bit chunk, most significant bit first
pub fn hash_chunk(bits: &[bool; BITSET_CHUNK_BITS]) -> Fr {
    let tag = Fr::from(DOMAIN_BITSET_COMPRESS);
    let two = Fr::from(2u64);
    let value = bits
        .iter()
        .fold(tag, |acc, bit| acc * two + Fr::from(*bit as u64));
    hash2(tag, value)
}

/// digest of the full vector: chunk hashes folded left to right
pub fn compress(bits: &Bits) -> Fr {
    let mut chunk_hashes = (0..BITSET_CHUNKS).map(|chunk| {
        let mut window = [false; BITSET_CHUNK_BITS];
        for (offset, slot) in window.iter_mut().enumerate() {
            let position = chunk * BITSET_CHUNK_BITS + offset;
            *slot = position < DECK_SIZE && bits[position];
        }
        hash_chunk(&window)
    });

    // BITSET_CHUNKS >= 1
    let first = chunk_hashes.next().unwrap_or_else(|| hash_chunk(&[false; BITSET_CHUNK_BITS]));
    chunk_hashes.fold(first, parent_hash)
}

/// digest of an all-zero vector, the state of a freshly loaded deck
pub fn empty_digest() -> Fr {
    compress(&[false; DECK_SIZE])
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumedBitset {
    bits: Bits,
    count: u32,
    hash: Fr,
}

/// before/after view of a single consumption
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitsetTransition {
    pub position: usize,
    pub old_bits: Bits,
    pub old_count: u32,
    pub old_hash: Fr,
    pub new_bits: Bits,
    pub new_count: u32,
    pub new_hash: Fr,
    /// the position was already set before this call
    pub repeated: bool,
}

impl Default for ConsumedBitset {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumedBitset {
    pub fn new() -> Self {
        Self {
            bits: [false; DECK_SIZE],
            count: 0,
            hash: empty_digest(),
        }
    }

    /// rebuild from persisted bits and count, recomputing the digest
    pub fn from_parts(bits: Bits, count: u32) -> Self {
        let hash = compress(&bits);
        Self { bits, count, hash }
    }

    pub fn bits(&self) -> &Bits {
        &self.bits
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn hash(&self) -> Fr {
        self.hash
    }

    pub fn is_consumed(&self, position: usize) -> bool {
        self.bits.get(position).copied().unwrap_or(false)
    }

    /// mark `position` consumed and report the transition
    ///
    /// consuming an already-set position still bumps the count unless
    /// `reject_repeat` is set, in which case it fails.
    pub fn consume(&mut self, position: usize, reject_repeat: bool) -> Result<BitsetTransition> {
        if position >= DECK_SIZE {
            return Err(Error::PositionOutOfRange {
                position,
                len: DECK_SIZE,
            });
        }

        let repeated = self.bits[position];
        if repeated {
            if reject_repeat {
                return Err(Error::AlreadyConsumed(position));
            }
            warn!("deck position {} consumed twice, count will overstate", position);
        }

        let old_bits = self.bits;
        let old_count = self.count;
        let old_hash = self.hash;

        self.bits[position] = true;
        self.count += 1;
        self.hash = compress(&self.bits);

        debug!(
            "consumed position {} (count {} -> {})",
            position, old_count, self.count
        );

        Ok(BitsetTransition {
            position,
            old_bits,
            old_count,
            old_hash,
            new_bits: self.bits,
            new_count: self.count,
            new_hash: self.hash,
            repeated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::field_to_decimal;
    use proptest::prelude::*;

    #[test]
    fn test_empty_digest_reproducible() {
        let a = empty_digest();
        let b = compress(&[false; DECK_SIZE]);
        assert_eq!(a, b);
        assert_eq!(ConsumedBitset::new().hash(), a);
        assert_eq!(
            field_to_decimal(&a),
            "6663010209294942156971505144893901459301500678764012382451485852486654715445"
        );
    }

    #[test]
    fn test_chunk_accumulator() {
        // only the last bit set: value = 3 * 2^16 + 1
        let mut bits = [false; BITSET_CHUNK_BITS];
        bits[BITSET_CHUNK_BITS - 1] = true;
        let tag = Fr::from(DOMAIN_BITSET_COMPRESS);
        let expected = hash2(tag, Fr::from(3u64 * 65536 + 1));
        assert_eq!(hash_chunk(&bits), expected);
    }

    #[test]
    fn test_left_fold_not_balanced() {
        let bits = [false; DECK_SIZE];
        let c = hash_chunk(&[false; BITSET_CHUNK_BITS]);
        let mut acc = c;
        for _ in 1..BITSET_CHUNKS {
            acc = parent_hash(acc, c);
        }
        assert_eq!(compress(&bits), acc);

        // balanced pairing over the same chunks gives something else
        let pair = parent_hash(c, c);
        let quad = parent_hash(pair, pair);
        let balanced = parent_hash(quad, parent_hash(pair, c));
        assert_ne!(compress(&bits), balanced);
    }

    #[test]
    fn test_swap_across_chunks_changes_digest() {
        let mut a = [false; DECK_SIZE];
        a[3] = true;
        let mut b = [false; DECK_SIZE];
        b[20] = true;
        assert_ne!(compress(&a), compress(&b));

        // same popcount, different order inside the last (padded) chunk
        let mut c = [false; DECK_SIZE];
        c[96] = true;
        let mut d = [false; DECK_SIZE];
        d[107] = true;
        assert_ne!(compress(&c), compress(&d));
    }

    #[test]
    fn test_consume_transition() {
        let mut bitset = ConsumedBitset::new();
        let t = bitset.consume(5, false).unwrap();
        assert_eq!(t.old_count, 0);
        assert_eq!(t.new_count, 1);
        assert!(!t.old_bits[5]);
        assert!(t.new_bits[5]);
        assert_ne!(t.old_hash, t.new_hash);
        assert_eq!(t.new_hash, compress(&t.new_bits));
        assert!(!t.repeated);
        assert!(bitset.is_consumed(5));
    }

    #[test]
    fn test_double_consume_counts_twice() {
        let mut bitset = ConsumedBitset::new();
        let first = bitset.consume(9, false).unwrap();
        let second = bitset.consume(9, false).unwrap();
        assert!(second.repeated);
        assert_eq!(second.new_count, 2);
        // bits did not move, so neither did the digest
        assert_eq!(second.old_hash, second.new_hash);
        assert_eq!(second.new_hash, first.new_hash);
    }

    #[test]
    fn test_double_consume_rejected() {
        let mut bitset = ConsumedBitset::new();
        bitset.consume(9, true).unwrap();
        assert!(matches!(bitset.consume(9, true), Err(Error::AlreadyConsumed(9))));
        assert_eq!(bitset.count(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut bitset = ConsumedBitset::new();
        assert!(bitset.consume(DECK_SIZE, false).is_err());
        assert_eq!(bitset.count(), 0);
    }

    #[test]
    fn test_from_parts_recomputes_hash() {
        let mut bitset = ConsumedBitset::new();
        bitset.consume(1, false).unwrap();
        bitset.consume(70, false).unwrap();
        let restored = ConsumedBitset::from_parts(*bitset.bits(), bitset.count());
        assert_eq!(restored, bitset);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_single_bit_positions_distinct(i in 0usize..DECK_SIZE, j in 0usize..DECK_SIZE) {
            prop_assume!(i != j);
            let mut a = [false; DECK_SIZE];
            a[i] = true;
            let mut b = [false; DECK_SIZE];
            b[j] = true;
            prop_assert_ne!(compress(&a), compress(&b));
        }
    }
}
