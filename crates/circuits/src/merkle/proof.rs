//! Merkle authentication path structure.

use super::MerkleError;
use crate::field::FieldElement;
use crate::poseidon::{hash2, HashError};

/// Position of the running node relative to its sibling at one level.
///
/// Serialized as the path index bit: `Left = 0`, `Right = 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The node is the left child; hash as `H2(node, sibling)`.
    Left,
    /// The node is the right child; hash as `H2(sibling, node)`.
    Right,
}

impl Direction {
    pub fn bit(self) -> u8 {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
        }
    }

    pub fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(Direction::Left),
            1 => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn is_right(self) -> bool {
        self == Direction::Right
    }
}

/// Sibling hashes and directions from leaf level to root level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    siblings: Vec<FieldElement>,
    directions: Vec<Direction>,
}

impl MerklePath {
    pub fn new(siblings: Vec<FieldElement>, directions: Vec<Direction>) -> Result<Self, MerkleError> {
        if siblings.len() != directions.len() {
            return Err(MerkleError::MalformedPath(format!(
                "{} siblings but {} directions",
                siblings.len(),
                directions.len()
            )));
        }
        Ok(Self {
            siblings,
            directions,
        })
    }

    /// Build a path from serialized `{0, 1}` index bits.
    pub fn from_indices(siblings: Vec<FieldElement>, indices: &[u8]) -> Result<Self, MerkleError> {
        let directions = indices
            .iter()
            .map(|&bit| {
                Direction::from_bit(bit)
                    .ok_or_else(|| MerkleError::MalformedPath(format!("path index {} is not 0 or 1", bit)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(siblings, directions)
    }

    pub fn siblings(&self) -> &[FieldElement] {
        &self.siblings
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Direction bits as stored in the pass file.
    pub fn indices(&self) -> Vec<u8> {
        self.directions.iter().map(|d| d.bit()).collect()
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Leaf index encoded by the directions (bit `i` is level `i`), or `None`
    /// if a right turn sits above level 63.
    pub fn leaf_index(&self) -> Option<u64> {
        self.directions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_right())
            .try_fold(0u64, |acc, (level, _)| {
                let bit = u32::try_from(level).ok().and_then(|l| 1u64.checked_shl(l))?;
                Some(acc | bit)
            })
    }

    /// Fold `leaf` up to the root this path commits to.
    pub fn compute_root(&self, leaf: FieldElement) -> Result<FieldElement, HashError> {
        let mut current = leaf;
        for (sibling, direction) in self.siblings.iter().zip(&self.directions) {
            current = match direction {
                Direction::Left => hash2(current, *sibling)?,
                Direction::Right => hash2(*sibling, current)?,
            };
        }
        Ok(current)
    }

    /// Check that `leaf` authenticates to `root` along this path.
    pub fn verify(&self, leaf: FieldElement, root: FieldElement) -> Result<bool, HashError> {
        Ok(self.compute_root(leaf)? == root)
    }
}
