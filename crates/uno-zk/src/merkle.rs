//! fixed-depth poseidon merkle tree over card commitments
//!
//! leaves are zero padded to TREE_WIDTH, so every tree built from a
//! non-empty leaf set has exactly TREE_DEPTH levels above the leaves.
//! trees are rebuilt from the full leaf set, never patched node by node.

use crate::commitment::parent_hash;
use crate::constants::{TREE_DEPTH, TREE_WIDTH};
use crate::error::{Error, Result};
use crate::field::{Fr, Zero};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    pub root: Fr,
    /// layers[0] = padded leaves, last layer = [root]
    pub layers: Vec<Vec<Fr>>,
}

/// inclusion path, always TREE_DEPTH entries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    /// sibling hashes from leaf to root
    pub path: [Fr; TREE_DEPTH],
    /// 0 = current node is the left child, 1 = right child
    pub indices: [u8; TREE_DEPTH],
}

impl MerkleTree {
    /// tree of an unloaded deck: root zero and a single zero layer, not
    /// TREE_WIDTH padded leaves
    pub fn empty() -> Self {
        Self {
            root: Fr::zero(),
            layers: vec![vec![Fr::zero()]],
        }
    }

    /// hash `leaves` (zero padded to TREE_WIDTH) up to a single root
    ///
    /// an empty leaf set is the one exception to the padding, it yields
    /// [`MerkleTree::empty`].
    pub fn build(leaves: &[Fr]) -> Result<Self> {
        if leaves.len() > TREE_WIDTH {
            return Err(Error::TooManyLeaves {
                got: leaves.len(),
                max: TREE_WIDTH,
            });
        }

        if leaves.is_empty() {
            return Ok(Self::empty());
        }

        let mut current = leaves.to_vec();
        current.resize(TREE_WIDTH, Fr::zero());

        let mut layers = Vec::with_capacity(TREE_DEPTH + 1);
        layers.push(current.clone());

        while current.len() > 1 {
            let next: Vec<Fr> = current
                .chunks_exact(2)
                .map(|pair| parent_hash(pair[0], pair[1]))
                .collect();
            layers.push(next.clone());
            current = next;
        }

        Ok(Self {
            root: current[0],
            layers,
        })
    }

    pub fn leaves(&self) -> &[Fr] {
        &self.layers[0]
    }

    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    pub fn prove(&self, leaf_index: usize) -> Result<MerkleProof> {
        prove_inclusion(&self.layers, leaf_index)
    }
}

/// sibling path for `leaf_index`, zero padded to TREE_DEPTH
pub fn prove_inclusion(layers: &[Vec<Fr>], leaf_index: usize) -> Result<MerkleProof> {
    let width = layers.first().map_or(0, Vec::len);
    if leaf_index >= width {
        return Err(Error::PositionOutOfRange {
            position: leaf_index,
            len: width,
        });
    }

    let mut path = [Fr::zero(); TREE_DEPTH];
    let mut indices = [0u8; TREE_DEPTH];
    let mut index = leaf_index;

    // the root layer has no sibling
    let height = layers.len().saturating_sub(1).min(TREE_DEPTH);
    for level in 0..height {
        let layer = &layers[level];
        let (sibling, bit) = if index % 2 == 0 {
            (index + 1, 0)
        } else {
            (index - 1, 1)
        };
        path[level] = layer.get(sibling).copied().unwrap_or_else(Fr::zero);
        indices[level] = bit;
        index /= 2;
    }

    Ok(MerkleProof { path, indices })
}

impl MerkleProof {
    /// fold `leaf` bottom-up through the path
    pub fn compute_root(&self, leaf: Fr) -> Fr {
        self.path
            .iter()
            .zip(self.indices.iter())
            .fold(leaf, |node, (sibling, bit)| {
                if *bit == 0 {
                    parent_hash(node, *sibling)
                } else {
                    parent_hash(*sibling, node)
                }
            })
    }

    pub fn verify(&self, leaf: Fr, root: Fr) -> bool {
        self.compute_root(leaf) == root
    }

    /// leaf position encoded by the direction bits
    pub fn leaf_index(&self) -> usize {
        self.indices
            .iter()
            .enumerate()
            .fold(0, |acc, (level, bit)| acc | ((*bit as usize) << level))
    }
}

/// root over a hand's card commitments
pub fn hand_root(commitments: &[Fr]) -> Result<Fr> {
    MerkleTree::build(commitments).map(|tree| tree.root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaves(n: usize) -> Vec<Fr> {
        (0..n).map(|i| Fr::from(i as u64 + 1)).collect()
    }

    fn assert_all_paths_fold(n: usize) {
        let leaves = leaves(n);
        let tree = MerkleTree::build(&leaves).unwrap();
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = tree.prove(i).unwrap();
            assert_eq!(proof.compute_root(*leaf), tree.root, "leaf {i} of {n}");
            assert_eq!(proof.leaf_index(), i);
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::build(&[]).unwrap();
        assert_eq!(tree.root, Fr::zero());
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree, MerkleTree::empty());
        assert_eq!(tree.layers, vec![vec![Fr::zero()]]);

        // shallower than TREE_DEPTH, path is all padding
        let proof = tree.prove(0).unwrap();
        assert_eq!(proof.path, [Fr::zero(); TREE_DEPTH]);
        assert_eq!(proof.indices, [0u8; TREE_DEPTH]);
    }

    #[test]
    fn test_padding_and_depth() {
        let tree = MerkleTree::build(&leaves(1)).unwrap();
        assert_eq!(tree.leaves().len(), TREE_WIDTH);
        assert_eq!(tree.depth(), TREE_DEPTH);
        assert_eq!(tree.layers.last().unwrap(), &vec![tree.root]);
        assert_ne!(tree.root, Fr::zero());
    }

    #[test]
    fn test_round_trip_sizes() {
        for n in [1, 37, 108, 128] {
            assert_all_paths_fold(n);
        }
    }

    #[test]
    fn test_too_many_leaves() {
        assert!(matches!(
            MerkleTree::build(&leaves(129)),
            Err(Error::TooManyLeaves { got: 129, max: 128 })
        ));
    }

    #[test]
    fn test_out_of_range_proof() {
        let tree = MerkleTree::build(&leaves(4)).unwrap();
        assert!(tree.prove(TREE_WIDTH).is_err());
        // padded slots are provable (they hold zero)
        let proof = tree.prove(100).unwrap();
        assert!(proof.verify(Fr::zero(), tree.root));
    }

    #[test]
    fn test_wrong_leaf_fails() {
        let leaves = leaves(8);
        let tree = MerkleTree::build(&leaves).unwrap();
        let proof = tree.prove(3).unwrap();
        assert!(proof.verify(leaves[3], tree.root));
        assert!(!proof.verify(leaves[4], tree.root));
    }

    #[test]
    fn test_deterministic_and_order_sensitive() {
        let a = leaves(10);
        let mut b = a.clone();
        b.swap(0, 1);
        assert_eq!(hand_root(&a).unwrap(), hand_root(&a).unwrap());
        assert_ne!(hand_root(&a).unwrap(), hand_root(&b).unwrap());
    }

    #[test]
    fn test_sibling_flags() {
        let tree = MerkleTree::build(&leaves(4)).unwrap();
        let even = tree.prove(2).unwrap();
        assert_eq!(even.indices[0], 0);
        assert_eq!(even.path[0], tree.layers[0][3]);
        let odd = tree.prove(3).unwrap();
        assert_eq!(odd.indices[0], 1);
        assert_eq!(odd.path[0], tree.layers[0][2]);
        assert_eq!(odd.indices[1], 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_inclusion_folds_to_root(n in 1usize..=TREE_WIDTH, pick in any::<prop::sample::Index>()) {
            let leaves = leaves(n);
            let tree = MerkleTree::build(&leaves).unwrap();
            let i = pick.index(n);
            let proof = tree.prove(i).unwrap();
            prop_assert_eq!(proof.compute_root(leaves[i]), tree.root);
        }
    }
}
