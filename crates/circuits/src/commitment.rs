//! Leaf commitments and nullifiers.
//!
//! leaf      = Poseidon(secret, borrower)
//! nullifier = Poseidon(secret, scope, borrower, nonce)

use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::SynthesisError;

use crate::field::FieldElement;
use crate::poseidon::{hash2, hash4, HashError, PoseidonSuite};

/// Namespace tag mixed into every nullifier. Fixed for a deployment:
/// changing it changes every derived nullifier.
pub const NULLIFIER_SCOPE: u64 = 1;

/// Commitment inserted into the allowlist tree.
pub fn compute_leaf(secret: FieldElement, borrower: FieldElement) -> Result<FieldElement, HashError> {
    hash2(secret, borrower)
}

/// Public nullifier for a given nonce.
pub fn compute_nullifier(
    secret: FieldElement,
    borrower: FieldElement,
    nonce: u64,
) -> Result<FieldElement, HashError> {
    hash4(
        secret,
        FieldElement::from(NULLIFIER_SCOPE),
        borrower,
        FieldElement::from(nonce),
    )
}

/// Compute the leaf in-circuit.
pub fn leaf_var(
    suite: &PoseidonSuite,
    secret: &FpVar<FieldElement>,
    borrower: &FpVar<FieldElement>,
) -> Result<FpVar<FieldElement>, SynthesisError> {
    suite
        .leaf_gadget()
        .hash(&[secret.clone(), borrower.clone()])
}

/// Compute the nullifier in-circuit.
pub fn nullifier_var(
    suite: &PoseidonSuite,
    secret: &FpVar<FieldElement>,
    borrower: &FpVar<FieldElement>,
    nonce: &FpVar<FieldElement>,
) -> Result<FpVar<FieldElement>, SynthesisError> {
    let scope = FpVar::Constant(FieldElement::from(NULLIFIER_SCOPE));
    suite
        .nullifier_gadget()
        .hash(&[secret.clone(), scope, borrower.clone(), nonce.clone()])
}
