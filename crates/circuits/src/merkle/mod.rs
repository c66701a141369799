//! Append-only Poseidon Merkle accumulator for the pass allowlist.
//!
//! This module provides:
//! - Native tree operations (insert, root, path extraction, snapshot rebuild)
//! - Authentication paths with host-side verification
//! - In-circuit path verification gadgets

mod gadgets;
mod proof;
mod tree;

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::poseidon::HashError;

pub use gadgets::{compute_root_from_path, verify_membership, MerklePathVar};
pub use proof::{Direction, MerklePath};
pub use tree::{zero_hashes, AllowlistTree, DEFAULT_DEPTH, MAX_DEPTH, ZERO_ELEMENT};

/// Errors from the accumulator.
#[derive(Error, Debug)]
pub enum MerkleError {
    #[error("tree of depth {depth} is full ({capacity} leaves)")]
    CapacityExceeded { depth: usize, capacity: u64 },
    #[error("leaf index {index} out of range (tree holds {size} leaves)")]
    IndexOutOfRange { index: u64, size: u64 },
    #[error("unsupported tree depth {0}")]
    InvalidDepth(usize),
    #[error("malformed authentication path: {0}")]
    MalformedPath(String),
    #[error(transparent)]
    Hash(#[from] HashError),
}
