//! BN254 scalar-field helpers: reduction, canonical hex encoding, address
//! embedding and secret sampling.

use ark_ff::PrimeField;
use num_bigint::{BigInt, BigUint, Sign};
use rand::{CryptoRng, RngCore};
use thiserror::Error;

use crate::ConstraintF;

/// Every hash input/output, tree node, secret and identifier lives here.
pub type FieldElement = ConstraintF;

/// Number of hex digits in the canonical encoding (32 bytes).
pub const FIELD_HEX_DIGITS: usize = 64;

/// Bytes of OS entropy drawn per secret before reduction.
/// 512 bits reduced mod a 254-bit prime leaves a bias below 2^-254.
pub const SECRET_ENTROPY_BYTES: usize = 64;

/// Length of an EVM address in bytes.
pub const ADDRESS_BYTES: usize = 20;

/// Errors raised when decoding field elements from external input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("invalid hex field element {0:?}")]
    InvalidHex(String),
    #[error("value {0} is not below the BN254 scalar modulus")]
    NonCanonical(String),
    #[error("invalid decimal field element {0:?}")]
    InvalidDecimal(String),
}

/// The scalar field modulus `p`.
pub fn modulus() -> BigUint {
    BigUint::from(FieldElement::MODULUS)
}

/// Reduce an arbitrary signed integer into `[0, p)`.
pub fn reduce(x: &BigInt) -> FieldElement {
    let p = BigInt::from(modulus());
    let mut r = x % &p;
    if r.sign() == Sign::Minus {
        r += &p;
    }
    let (_, bytes) = r.to_bytes_be();
    FieldElement::from_be_bytes_mod_order(&bytes)
}

/// Reduce an unsigned big-endian byte string into the field.
pub fn reduce_be_bytes(bytes: &[u8]) -> FieldElement {
    FieldElement::from_be_bytes_mod_order(bytes)
}

/// Integer value of a field element.
pub fn to_biguint(value: &FieldElement) -> BigUint {
    BigUint::from(value.into_bigint())
}

/// Canonical encoding: `0x` followed by 64 lowercase, zero-padded hex digits.
pub fn to_hex(value: &FieldElement) -> String {
    let digits = to_biguint(value).to_str_radix(16);
    format!("0x{:0>width$}", digits, width = FIELD_HEX_DIGITS)
}

/// Decimal encoding, as used for public signals.
pub fn to_decimal(value: &FieldElement) -> String {
    to_biguint(value).to_str_radix(10)
}

/// Parse a `0x`-prefixed hex field element.
///
/// Shorter encodings are accepted; values at or above `p` are rejected
/// rather than silently reduced.
pub fn from_hex(s: &str) -> Result<FieldElement, FieldError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| FieldError::InvalidHex(s.to_string()))?;

    if digits.is_empty() || digits.len() > FIELD_HEX_DIGITS {
        return Err(FieldError::InvalidHex(s.to_string()));
    }

    let value = BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| FieldError::InvalidHex(s.to_string()))?;
    from_biguint_strict(value, s)
}

/// Parse a decimal field element, rejecting non-canonical values.
pub fn from_decimal(s: &str) -> Result<FieldElement, FieldError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::InvalidDecimal(s.to_string()));
    }
    let value = BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| FieldError::InvalidDecimal(s.to_string()))?;
    from_biguint_strict(value, s)
}

fn from_biguint_strict(value: BigUint, original: &str) -> Result<FieldElement, FieldError> {
    if value >= modulus() {
        return Err(FieldError::NonCanonical(original.to_string()));
    }
    Ok(reduce_be_bytes(&value.to_bytes_be()))
}

/// Embed a 20-byte address as the field element of its big-endian integer value.
pub fn address_to_field(address: &[u8; ADDRESS_BYTES]) -> FieldElement {
    reduce_be_bytes(address)
}

/// Sample a uniformly distributed secret from a cryptographically secure RNG.
pub fn random_secret<R: RngCore + CryptoRng>(rng: &mut R) -> FieldElement {
    let mut wide = [0u8; SECRET_ENTROPY_BYTES];
    rng.fill_bytes(&mut wide);
    reduce_be_bytes(&wide)
}
