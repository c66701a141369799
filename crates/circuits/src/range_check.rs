//! Range check gadgets for public inputs with a bounded domain.
//!
//! The borrower must fit in 160 bits and the nonce in 64 bits.

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

/// Bits in an EVM address.
pub const ADDRESS_BITS: usize = 160;

/// Bits in a nonce.
pub const NONCE_BITS: usize = 64;

/// Enforce that a field element fits in `num_bits` bits.
///
/// Decomposes the value and forces every bit at or above `num_bits` to zero.
pub fn enforce_range<F: PrimeField>(value: &FpVar<F>, num_bits: usize) -> Result<(), SynthesisError> {
    let value_bits = value.to_bits_le()?;

    for bit in value_bits.iter().skip(num_bits) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }

    Ok(())
}

/// Enforce that a value is a valid 20-byte address.
pub fn enforce_address<F: PrimeField>(value: &FpVar<F>) -> Result<(), SynthesisError> {
    enforce_range(value, ADDRESS_BITS)
}

/// Enforce that a value is a valid nonce.
pub fn enforce_nonce<F: PrimeField>(value: &FpVar<F>) -> Result<(), SynthesisError> {
    enforce_range(value, NONCE_BITS)
}
