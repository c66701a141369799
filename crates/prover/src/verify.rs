//! Local proof verification.

use ark_bn254::Bn254;
use ark_groth16::{Groth16, Proof, VerifyingKey};
use ark_snark::SNARK;
use zkpass_circuits::{FieldElement, PassPublicInputs};

use crate::calldata::ProofCalldata;
use crate::error::{PassError, Result};

/// Verify a pass proof against `[root, nullifier, borrower, nonce]`.
pub fn verify_pass(
    vk: &VerifyingKey<Bn254>,
    proof: &Proof<Bn254>,
    public: &PassPublicInputs,
) -> Result<bool> {
    Groth16::<Bn254>::verify(vk, &public.to_field_elements(), proof)
        .map_err(|e| PassError::Verification(e.to_string()))
}

/// Decode a calldata artifact and verify it for `borrower`.
pub fn verify_calldata(
    vk: &VerifyingKey<Bn254>,
    calldata: &ProofCalldata,
    borrower: FieldElement,
) -> Result<bool> {
    let proof = calldata.proof()?;
    let public = calldata.public_inputs(borrower)?;
    verify_pass(vk, &proof, &public)
}
