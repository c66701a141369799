//! In-circuit Merkle path verification.

use ark_r1cs_std::{boolean::Boolean, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::proof::MerklePath;
use crate::field::FieldElement;
use crate::poseidon::PoseidonGadget;

/// Circuit variable representation of an authentication path.
#[derive(Clone)]
pub struct MerklePathVar {
    /// Sibling hashes as circuit variables
    siblings: Vec<FpVar<FieldElement>>,
    /// `true` where the running node is the right child
    directions: Vec<Boolean<FieldElement>>,
}

impl MerklePathVar {
    /// Allocate a path of `depth` levels as witness variables.
    ///
    /// `path` is `None` during key generation; values are only requested in
    /// proving mode.
    pub fn new_witness(
        cs: ConstraintSystemRef<FieldElement>,
        path: Option<&MerklePath>,
        depth: usize,
    ) -> Result<Self, SynthesisError> {
        if let Some(path) = path {
            if path.depth() != depth {
                return Err(SynthesisError::Unsatisfiable);
            }
        }

        let mut siblings = Vec::with_capacity(depth);
        let mut directions = Vec::with_capacity(depth);
        for level in 0..depth {
            siblings.push(FpVar::new_witness(cs.clone(), || {
                path.map(|p| p.siblings()[level])
                    .ok_or(SynthesisError::AssignmentMissing)
            })?);
            directions.push(Boolean::new_witness(cs.clone(), || {
                path.map(|p| p.directions()[level].is_right())
                    .ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        Ok(Self {
            siblings,
            directions,
        })
    }
}

/// Compute the root from a leaf and a path in-circuit.
pub fn compute_root_from_path(
    hasher: &PoseidonGadget<'_>,
    leaf: &FpVar<FieldElement>,
    path: &MerklePathVar,
) -> Result<FpVar<FieldElement>, SynthesisError> {
    let mut current = leaf.clone();

    for (sibling, is_right) in path.siblings.iter().zip(path.directions.iter()) {
        // If is_right: H(sibling, current), else H(current, sibling)
        let left = is_right.select(sibling, &current)?;
        let right = is_right.select(&current, sibling)?;

        current = hasher.hash(&[left, right])?;
    }

    Ok(current)
}

/// Enforce that `leaf` is a member of the tree with root `expected_root`.
pub fn verify_membership(
    hasher: &PoseidonGadget<'_>,
    expected_root: &FpVar<FieldElement>,
    leaf: &FpVar<FieldElement>,
    path: &MerklePathVar,
) -> Result<(), SynthesisError> {
    let computed_root = compute_root_from_path(hasher, leaf, path)?;
    computed_root.enforce_equal(expected_root)
}
