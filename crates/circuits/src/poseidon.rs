//! circomlib-compatible Poseidon over BN254.
//!
//! The host side goes through `light-poseidon`, which reproduces circomlib's
//! `poseidon.circom` outputs. The in-circuit permutation is driven by the same
//! parameter tables, so a proof witness computed here is accepted by the
//! constraints built here.
//!
//! Layout of the state is circomlib's: `[0, in_0, .., in_{n-1}]`, the output is
//! `state[0]` after the permutation.

use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::SynthesisError;
use light_poseidon::{
    parameters::bn254_x5::get_poseidon_parameters, Poseidon, PoseidonError, PoseidonHasher,
    PoseidonParameters,
};
use thiserror::Error;

use crate::field::FieldElement;

/// Arity of the leaf commitment and of every Merkle node.
pub const LEAF_ARITY: usize = 2;

/// Arity of the nullifier derivation.
pub const NULLIFIER_ARITY: usize = 4;

/// Failure to build or run a Poseidon instance.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("poseidon: {0}")]
    Poseidon(#[from] PoseidonError),
    #[error("poseidon arity {0} is not configured")]
    UnsupportedArity(usize),
}

fn hash_native(inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
    let mut poseidon = Poseidon::<FieldElement>::new_circom(inputs.len())?;
    Ok(poseidon.hash(inputs)?)
}

/// `H2(a, b)`.
pub fn hash2(a: FieldElement, b: FieldElement) -> Result<FieldElement, HashError> {
    hash_native(&[a, b])
}

/// `H4(a, b, c, d)`.
pub fn hash4(
    a: FieldElement,
    b: FieldElement,
    c: FieldElement,
    d: FieldElement,
) -> Result<FieldElement, HashError> {
    hash_native(&[a, b, c, d])
}

/// Parameter tables for both arities used by the pass circuit.
pub struct PoseidonSuite {
    leaf: PoseidonParameters<FieldElement>,
    nullifier: PoseidonParameters<FieldElement>,
}

impl PoseidonSuite {
    /// Load the circomlib tables for widths 3 and 5.
    pub fn new() -> Result<Self, HashError> {
        Ok(Self {
            leaf: get_poseidon_parameters::<FieldElement>((LEAF_ARITY + 1) as u8)?,
            nullifier: get_poseidon_parameters::<FieldElement>((NULLIFIER_ARITY + 1) as u8)?,
        })
    }

    /// Gadget for a given arity.
    #[cfg(test)]
    pub(crate) fn gadget(&self, arity: usize) -> Result<PoseidonGadget<'_>, HashError> {
        match arity {
            LEAF_ARITY => Ok(PoseidonGadget::new(&self.leaf)),
            NULLIFIER_ARITY => Ok(PoseidonGadget::new(&self.nullifier)),
            other => Err(HashError::UnsupportedArity(other)),
        }
    }

    pub fn leaf_gadget(&self) -> PoseidonGadget<'_> {
        PoseidonGadget::new(&self.leaf)
    }

    pub fn nullifier_gadget(&self) -> PoseidonGadget<'_> {
        PoseidonGadget::new(&self.nullifier)
    }
}

/// In-circuit Poseidon permutation for one width.
pub struct PoseidonGadget<'a> {
    params: &'a PoseidonParameters<FieldElement>,
}

impl<'a> PoseidonGadget<'a> {
    pub fn new(params: &'a PoseidonParameters<FieldElement>) -> Self {
        Self { params }
    }

    /// Number of inputs this gadget hashes.
    pub fn arity(&self) -> usize {
        self.params.width - 1
    }

    /// Compute Poseidon hash in-circuit.
    pub fn hash(&self, inputs: &[FpVar<FieldElement>]) -> Result<FpVar<FieldElement>, SynthesisError> {
        if inputs.len() != self.arity() {
            return Err(SynthesisError::Unsatisfiable);
        }

        let width = self.params.width;
        let mut state = Vec::with_capacity(width);
        state.push(FpVar::zero());
        state.extend(inputs.iter().cloned());

        let half_full = self.params.full_rounds / 2;
        let total = self.params.full_rounds + self.params.partial_rounds;

        for round in 0..total {
            for (i, s) in state.iter_mut().enumerate() {
                *s += self.params.ark[round * width + i];
            }

            let full = round < half_full || round >= half_full + self.params.partial_rounds;
            if full {
                for s in state.iter_mut() {
                    *s = self.sbox(s)?;
                }
            } else {
                state[0] = self.sbox(&state[0])?;
            }

            state = self.mix(&state);
        }

        Ok(state.swap_remove(0))
    }

    // alpha = 5
    fn sbox(&self, x: &FpVar<FieldElement>) -> Result<FpVar<FieldElement>, SynthesisError> {
        let x2 = x.square()?;
        let x4 = x2.square()?;
        Ok(x4 * x)
    }

    // Linear layer, free in R1CS.
    fn mix(&self, state: &[FpVar<FieldElement>]) -> Vec<FpVar<FieldElement>> {
        self.params
            .mds
            .iter()
            .map(|row| {
                state
                    .iter()
                    .zip(row.iter())
                    .fold(FpVar::zero(), |acc, (s, m)| acc + s * *m)
            })
            .collect()
    }
}
