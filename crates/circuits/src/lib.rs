//! ZK primitives and circuit for private borrower passes.
//!
//! This crate provides:
//! - `field`: BN254 scalar-field reduction, hex codec and secret sampling
//! - `poseidon`: circomlib-compatible Poseidon, host side and in-circuit
//! - `commitment`: leaf commitments and nonce-scoped nullifiers
//! - `merkle`: the append-only allowlist tree and its path gadgets
//! - `PassCircuit`: Groth16 statement tying membership and nullifier together

pub mod commitment;
pub mod field;
pub mod merkle;
pub mod pass;
pub mod poseidon;
pub mod range_check;


pub use commitment::{compute_leaf, compute_nullifier, NULLIFIER_SCOPE};
pub use field::{FieldElement, FieldError};
pub use merkle::{AllowlistTree, Direction, MerkleError, MerklePath, DEFAULT_DEPTH};
pub use pass::{PassCircuit, PassPublicInputs, PUBLIC_INPUT_ORDER};
pub use poseidon::{hash2, hash4, HashError, PoseidonSuite};

use ark_bn254::Fr;

/// Common type aliases
pub type ConstraintF = Fr;
