//! Fixed-depth, append-only allowlist tree.
//!
//! Empty positions hold the zero element; an empty subtree of height `h` hashes
//! to `zeros[h]`, with `zeros[0] = 0` and `zeros[h + 1] = H2(zeros[h], zeros[h])`.
//! Only non-empty nodes are stored, so memory tracks the number of leaves
//! rather than the capacity.

use ark_ff::Field;
use rayon::prelude::*;

use super::{Direction, MerkleError, MerklePath};
use crate::field::FieldElement;
use crate::poseidon::{hash2, HashError};

/// Depth of the deployed allowlist (capacity 2^20).
pub const DEFAULT_DEPTH: usize = 20;

/// Largest depth accepted by the tree.
pub const MAX_DEPTH: usize = 32;

/// Padding value for empty leaves.
pub const ZERO_ELEMENT: FieldElement = FieldElement::ZERO;

/// Roots of empty subtrees for heights `0..=depth`.
pub fn zero_hashes(depth: usize) -> Result<Vec<FieldElement>, HashError> {
    let mut zeros = Vec::with_capacity(depth + 1);
    zeros.push(ZERO_ELEMENT);
    for level in 0..depth {
        let below = zeros[level];
        zeros.push(hash2(below, below)?);
    }
    Ok(zeros)
}

/// The allowlist accumulator.
///
/// `layers[0]` holds the leaves in insertion order, `layers[depth]` holds the
/// root once at least one leaf exists.
#[derive(Clone, Debug)]
pub struct AllowlistTree {
    depth: usize,
    zeros: Vec<FieldElement>,
    layers: Vec<Vec<FieldElement>>,
}

impl AllowlistTree {
    /// Create an empty tree.
    pub fn new(depth: usize) -> Result<Self, MerkleError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(MerkleError::InvalidDepth(depth));
        }

        Ok(Self {
            depth,
            zeros: zero_hashes(depth)?,
            layers: vec![Vec::new(); depth + 1],
        })
    }

    /// Rebuild a tree from a persisted leaf snapshot.
    ///
    /// Produces the same roots and paths as inserting `leaves` one by one.
    pub fn from_leaves(depth: usize, leaves: &[FieldElement]) -> Result<Self, MerkleError> {
        let mut tree = Self::new(depth)?;
        if leaves.len() as u64 > tree.capacity() {
            return Err(MerkleError::CapacityExceeded {
                depth,
                capacity: tree.capacity(),
            });
        }

        tree.layers[0] = leaves.to_vec();
        for level in 0..depth {
            let pad = tree.zeros[level];
            let next = tree.layers[level]
                .par_chunks(2)
                .map(|pair| hash2(pair[0], pair.get(1).copied().unwrap_or(pad)))
                .collect::<Result<Vec<_>, _>>()?;
            tree.layers[level + 1] = next;
        }

        Ok(tree)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Maximum number of leaves.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// Leaves in insertion order.
    pub fn leaves(&self) -> &[FieldElement] {
        &self.layers[0]
    }

    pub fn leaf(&self, index: usize) -> Option<FieldElement> {
        self.layers[0].get(index).copied()
    }

    /// Root of an empty subtree of the given height.
    pub fn zero(&self, height: usize) -> Option<FieldElement> {
        self.zeros.get(height).copied()
    }

    /// Append a leaf and return its index.
    ///
    /// All parent hashes are computed before anything is written, so a failed
    /// insertion leaves the tree untouched.
    pub fn insert(&mut self, leaf: FieldElement) -> Result<usize, MerkleError> {
        let index = self.len();
        if index as u64 >= self.capacity() {
            return Err(MerkleError::CapacityExceeded {
                depth: self.depth,
                capacity: self.capacity(),
            });
        }

        let mut parents = Vec::with_capacity(self.depth);
        let mut current = leaf;
        let mut idx = index;
        for level in 0..self.depth {
            let sibling = self.node(level, idx ^ 1);
            current = if idx & 1 == 1 {
                hash2(sibling, current)?
            } else {
                hash2(current, sibling)?
            };
            parents.push(current);
            idx >>= 1;
        }

        self.layers[0].push(leaf);
        let mut idx = index;
        for (level, hash) in parents.into_iter().enumerate() {
            idx >>= 1;
            let layer = &mut self.layers[level + 1];
            if idx < layer.len() {
                layer[idx] = hash;
            } else {
                layer.push(hash);
            }
        }

        Ok(index)
    }

    /// Current root, zero-padded to full depth.
    pub fn root(&self) -> FieldElement {
        self.layers[self.depth]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.depth])
    }

    /// Authentication path for the leaf at `index`, leaf level first.
    pub fn path(&self, index: usize) -> Result<MerklePath, MerkleError> {
        if index >= self.len() {
            return Err(MerkleError::IndexOutOfRange {
                index: index as u64,
                size: self.len() as u64,
            });
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut directions = Vec::with_capacity(self.depth);
        let mut idx = index;
        for level in 0..self.depth {
            siblings.push(self.node(level, idx ^ 1));
            directions.push(if idx & 1 == 1 {
                Direction::Right
            } else {
                Direction::Left
            });
            idx >>= 1;
        }

        MerklePath::new(siblings, directions)
    }

    fn node(&self, level: usize, index: usize) -> FieldElement {
        self.layers[level]
            .get(index)
            .copied()
            .unwrap_or(self.zeros[level])
    }
}
