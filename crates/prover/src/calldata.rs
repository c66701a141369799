//! Solidity calldata encoding for pass proofs.
//!
//! EVM pairing precompiles take G2 coordinates as `(c1, c0)`, arkworks stores
//! them as `(c0, c1)`. The swap lives in `to_solidity_proof` and is undone by
//! `from_solidity_proof`; nothing else touches coordinate order.

use std::path::Path;

use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{PrimeField, Zero};
use ark_groth16::Proof;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use zkpass_circuits::field;
use zkpass_circuits::PassPublicInputs;

use crate::error::{PassError, Result};
use crate::store::write_atomic;

/// Decimals of the borrowed token.
pub const TOKEN_DECIMALS: usize = 18;

/// Amount used when the caller does not give one.
pub const DEFAULT_AMOUNT: &str = "10";

/// Proof points as `uint256` hex strings, B coordinates swapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidityProof {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
}

/// The artifact handed to the on-chain verifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofCalldata {
    pub amount: String,
    pub root: String,
    pub nullifier: String,
    pub nonce: String,
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
}

fn fq_to_hex(value: &Fq) -> String {
    let digits = BigUint::from(value.into_bigint()).to_str_radix(16);
    format!("0x{:0>64}", digits)
}

fn fq_from_hex(s: &str) -> Result<Fq> {
    let digits = s
        .strip_prefix("0x")
        .filter(|d| !d.is_empty() && d.len() <= 64)
        .ok_or_else(|| PassError::Verification(format!("bad coordinate {:?}", s)))?;
    let value = BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| PassError::Verification(format!("bad coordinate {:?}", s)))?;
    if value >= BigUint::from(Fq::MODULUS) {
        return Err(PassError::Verification(format!(
            "coordinate {} is not below the base field modulus",
            s
        )));
    }
    Ok(Fq::from_be_bytes_mod_order(&value.to_bytes_be()))
}

fn g1_coords(p: &G1Affine) -> [String; 2] {
    match p.xy() {
        Some((x, y)) => [fq_to_hex(x), fq_to_hex(y)],
        None => [fq_to_hex(&Fq::zero()), fq_to_hex(&Fq::zero())],
    }
}

fn g1_from_coords(coords: &[String; 2]) -> Result<G1Affine> {
    let x = fq_from_hex(&coords[0])?;
    let y = fq_from_hex(&coords[1])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }

    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PassError::Verification("G1 point is not on the curve".into()));
    }
    Ok(point)
}

fn g2_from_coords(coords: &[[String; 2]; 2]) -> Result<G2Affine> {
    // Stored as [[x.c1, x.c0], [y.c1, y.c0]].
    let x = Fq2::new(fq_from_hex(&coords[0][1])?, fq_from_hex(&coords[0][0])?);
    let y = Fq2::new(fq_from_hex(&coords[1][1])?, fq_from_hex(&coords[1][0])?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }

    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PassError::Verification(
            "G2 point is not in the prime-order subgroup".into(),
        ));
    }
    Ok(point)
}

/// Encode a proof for a Solidity Groth16 verifier.
pub fn to_solidity_proof(proof: &Proof<Bn254>) -> SolidityProof {
    let b = match proof.b.xy() {
        Some((x, y)) => [
            [fq_to_hex(&x.c1), fq_to_hex(&x.c0)],
            [fq_to_hex(&y.c1), fq_to_hex(&y.c0)],
        ],
        None => {
            let zero = fq_to_hex(&Fq::zero());
            [[zero.clone(), zero.clone()], [zero.clone(), zero]]
        }
    };

    SolidityProof {
        a: g1_coords(&proof.a),
        b,
        c: g1_coords(&proof.c),
    }
}

/// Inverse of `to_solidity_proof`, with curve and subgroup checks.
pub fn from_solidity_proof(encoded: &SolidityProof) -> Result<Proof<Bn254>> {
    Ok(Proof {
        a: g1_from_coords(&encoded.a)?,
        b: g2_from_coords(&encoded.b)?,
        c: g1_from_coords(&encoded.c)?,
    })
}

/// Scale a decimal token amount to its smallest unit (10^18 per token).
///
/// Accepts integers and up to 18 fractional digits. Zero is rejected.
pub fn scale_amount(amount: &str) -> Result<BigUint> {
    let invalid = || PassError::InvalidAmount(amount.to_string());

    let (whole, frac) = match amount.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
        || frac.len() > TOKEN_DECIMALS
        || (amount.contains('.') && frac.is_empty())
    {
        return Err(invalid());
    }

    let padded = format!("{}{:0<width$}", whole, frac, width = TOKEN_DECIMALS);
    let wei = BigUint::parse_bytes(padded.as_bytes(), 10).ok_or_else(invalid)?;
    if wei.is_zero() {
        return Err(invalid());
    }
    Ok(wei)
}

impl ProofCalldata {
    pub fn new(amount_wei: &BigUint, public: &PassPublicInputs, proof: &Proof<Bn254>) -> Self {
        let SolidityProof { a, b, c } = to_solidity_proof(proof);
        Self {
            amount: amount_wei.to_str_radix(10),
            root: field::to_hex(&public.root),
            nullifier: field::to_hex(&public.nullifier),
            nonce: public.nonce.to_string(),
            a,
            b,
            c,
        }
    }

    pub fn solidity_proof(&self) -> SolidityProof {
        SolidityProof {
            a: self.a.clone(),
            b: self.b.clone(),
            c: self.c.clone(),
        }
    }

    pub fn proof(&self) -> Result<Proof<Bn254>> {
        from_solidity_proof(&self.solidity_proof())
    }

    /// Public inputs for `borrower`, who is the transaction sender on chain
    /// and therefore not part of the artifact.
    pub fn public_inputs(&self, borrower: zkpass_circuits::FieldElement) -> Result<PassPublicInputs> {
        for (name, value) in [("root", &self.root), ("nullifier", &self.nullifier)] {
            if value.len() != 2 + field::FIELD_HEX_DIGITS {
                return Err(PassError::Verification(format!(
                    "{} must be 32-byte hex, got {:?}",
                    name, value
                )));
            }
        }
        let nonce = self
            .nonce
            .parse::<u64>()
            .map_err(|_| PassError::Verification(format!("bad nonce {:?}", self.nonce)))?;

        Ok(PassPublicInputs {
            root: field::from_hex(&self.root)?,
            nullifier: field::from_hex(&self.nullifier)?,
            borrower,
            nonce,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| PassError::storage(path, e))?;
        write_atomic(path, &json)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PassError::storage(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| PassError::storage(path, format!("malformed calldata: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::CurveGroup;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use ark_std::UniformRand;

    fn random_proof(seed: u64) -> Proof<Bn254> {
        let mut rng = StdRng::seed_from_u64(seed);
        Proof {
            a: ark_bn254::G1Projective::rand(&mut rng).into_affine(),
            b: ark_bn254::G2Projective::rand(&mut rng).into_affine(),
            c: ark_bn254::G1Projective::rand(&mut rng).into_affine(),
        }
    }

    #[test]
    fn test_b_coordinates_are_swapped() {
        let proof = random_proof(1);
        let encoded = to_solidity_proof(&proof);
        let (x, y) = proof.b.xy().unwrap();

        assert_eq!(encoded.b[0], [fq_to_hex(&x.c1), fq_to_hex(&x.c0)]);
        assert_eq!(encoded.b[1], [fq_to_hex(&y.c1), fq_to_hex(&y.c0)]);

        let (ax, ay) = proof.a.xy().unwrap();
        assert_eq!(encoded.a, [fq_to_hex(ax), fq_to_hex(ay)]);
        assert!(encoded.a[0].starts_with("0x"));
        assert_eq!(encoded.a[0].len(), 66);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let proof = random_proof(2);
        assert_eq!(from_solidity_proof(&to_solidity_proof(&proof)).unwrap(), proof);
    }

    #[test]
    fn test_decode_rejects_unswapped_b() {
        let proof = random_proof(3);
        let mut encoded = to_solidity_proof(&proof);
        encoded.b[0].swap(0, 1);
        encoded.b[1].swap(0, 1);
        assert!(from_solidity_proof(&encoded).is_err());
    }

    #[test]
    fn test_decode_rejects_off_curve_point() {
        let mut encoded = to_solidity_proof(&random_proof(4));
        encoded.a[1] = fq_to_hex(&Fq::from(5u64));
        assert!(matches!(
            from_solidity_proof(&encoded),
            Err(PassError::Verification(_))
        ));
    }

    #[test]
    fn test_scale_amount() {
        assert_eq!(scale_amount("10").unwrap().to_string(), "10000000000000000000");
        assert_eq!(scale_amount(DEFAULT_AMOUNT).unwrap().to_string(), "10000000000000000000");
        assert_eq!(scale_amount("1.5").unwrap().to_string(), "1500000000000000000");
        assert_eq!(scale_amount("0.000000000000000001").unwrap().to_string(), "1");
        assert_eq!(scale_amount(".25").unwrap().to_string(), "250000000000000000");

        for bad in ["0", "0.0", "", ".", "-1", "1e18", "1.", "0.0000000000000000001", "ten"] {
            assert!(
                matches!(scale_amount(bad), Err(PassError::InvalidAmount(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_calldata_json_layout() {
        let public = PassPublicInputs {
            root: zkpass_circuits::FieldElement::from(1u64),
            nullifier: zkpass_circuits::FieldElement::from(2u64),
            borrower: zkpass_circuits::FieldElement::from(3u64),
            nonce: 4,
        };
        let calldata = ProofCalldata::new(&scale_amount("10").unwrap(), &public, &random_proof(5));

        let json: serde_json::Value = serde_json::to_value(&calldata).unwrap();
        assert_eq!(json["amount"], "10000000000000000000");
        assert_eq!(json["nonce"], "4");
        assert_eq!(json["root"].as_str().unwrap().len(), 66);
        assert_eq!(json["b"].as_array().unwrap().len(), 2);

        let decoded = calldata.public_inputs(public.borrower).unwrap();
        assert_eq!(decoded, public);
    }

    #[test]
    fn test_calldata_requires_full_width_hex() {
        let public = PassPublicInputs {
            root: zkpass_circuits::FieldElement::from(1u64),
            nullifier: zkpass_circuits::FieldElement::from(2u64),
            borrower: zkpass_circuits::FieldElement::from(3u64),
            nonce: 0,
        };
        let mut calldata = ProofCalldata::new(&scale_amount("1").unwrap(), &public, &random_proof(6));
        calldata.root = "0x01".into();
        assert!(matches!(
            calldata.public_inputs(public.borrower),
            Err(PassError::Verification(_))
        ));
    }
}
