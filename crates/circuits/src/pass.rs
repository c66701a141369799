//! PassCircuit: proves allowlist membership and nullifier derivation for a pass.

use std::sync::Arc;

use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::commitment::{leaf_var, nullifier_var};
use crate::field::FieldElement;
use crate::merkle::{verify_membership, MerklePath, MerklePathVar};
use crate::poseidon::PoseidonSuite;
use crate::range_check::{enforce_address, enforce_nonce};

/// Public input names in allocation order. Prover, verifier and calldata
/// consumers all index public signals by this order.
pub const PUBLIC_INPUT_ORDER: [&str; 4] = ["root", "nullifier", "borrower", "nonce"];

/// The statement a pass proof is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassPublicInputs {
    pub root: FieldElement,
    pub nullifier: FieldElement,
    pub borrower: FieldElement,
    pub nonce: u64,
}

impl PassPublicInputs {
    /// Field elements in `PUBLIC_INPUT_ORDER`.
    pub fn to_field_elements(&self) -> Vec<FieldElement> {
        vec![
            self.root,
            self.nullifier,
            self.borrower,
            FieldElement::from(self.nonce),
        ]
    }
}

/// Circuit that proves: "I know `secret` such that H2(secret, borrower) is a
/// leaf under `root`, and `nullifier` = H4(secret, 1, borrower, nonce)".
///
/// Public inputs (in order):
/// - root: allowlist root the pass was issued against
/// - nullifier: replay tag for this nonce
/// - borrower: 160-bit address
/// - nonce: 64-bit rotation counter
///
/// Private witnesses:
/// - secret: the pass secret
/// - path: sibling hashes and directions from the leaf to `root`
#[derive(Clone)]
pub struct PassCircuit {
    /// Private: pass secret
    pub secret: Option<FieldElement>,
    /// Private: authentication path
    pub path: Option<MerklePath>,

    /// Public: allowlist root
    pub root: Option<FieldElement>,
    /// Public: nullifier
    pub nullifier: Option<FieldElement>,
    /// Public: borrower address as a field element
    pub borrower: Option<FieldElement>,
    /// Public: nonce
    pub nonce: Option<u64>,

    /// Tree depth; fixes the circuit shape
    pub depth: usize,
    /// Poseidon parameters for both arities
    pub poseidon: Arc<PoseidonSuite>,
}

impl PassCircuit {
    /// Create a new circuit instance for proving.
    pub fn new(
        secret: FieldElement,
        path: MerklePath,
        public: PassPublicInputs,
        poseidon: Arc<PoseidonSuite>,
    ) -> Self {
        Self {
            depth: path.depth(),
            secret: Some(secret),
            path: Some(path),
            root: Some(public.root),
            nullifier: Some(public.nullifier),
            borrower: Some(public.borrower),
            nonce: Some(public.nonce),
            poseidon,
        }
    }

    /// Create an empty circuit for setup (constraint generation only).
    pub fn empty(depth: usize, poseidon: Arc<PoseidonSuite>) -> Self {
        Self {
            secret: None,
            path: None,
            root: None,
            nullifier: None,
            borrower: None,
            nonce: None,
            depth,
            poseidon,
        }
    }
}

impl ConstraintSynthesizer<FieldElement> for PassCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<FieldElement>) -> Result<(), SynthesisError> {
        // 1. Allocate private witnesses
        let secret_var = FpVar::new_witness(cs.clone(), || {
            self.secret.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let path_var = MerklePathVar::new_witness(cs.clone(), self.path.as_ref(), self.depth)?;

        // 2. Allocate public inputs, in PUBLIC_INPUT_ORDER
        let root_var = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_var_in = FpVar::new_input(cs.clone(), || {
            self.nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let borrower_var = FpVar::new_input(cs.clone(), || {
            self.borrower.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nonce_var = FpVar::new_input(cs.clone(), || {
            self.nonce
                .map(FieldElement::from)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        // 3. Bound borrower and nonce to their integer domains
        enforce_address(&borrower_var)?;
        enforce_nonce(&nonce_var)?;

        // 4. Membership: H2(secret, borrower) is a leaf under root
        let leaf = leaf_var(&self.poseidon, &secret_var, &borrower_var)?;
        verify_membership(&self.poseidon.leaf_gadget(), &root_var, &leaf, &path_var)?;

        // 5. Nullifier: H4(secret, 1, borrower, nonce) == nullifier
        let computed_nullifier = nullifier_var(&self.poseidon, &secret_var, &borrower_var, &nonce_var)?;
        computed_nullifier.enforce_equal(&nullifier_var_in)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{compute_leaf, compute_nullifier};
    use crate::field::address_to_field;
    use crate::merkle::AllowlistTree;
    use ark_relations::r1cs::ConstraintSystem;

    struct Fixture {
        secret: FieldElement,
        path: MerklePath,
        public: PassPublicInputs,
    }

    fn fixture(depth: usize, nonce: u64) -> Fixture {
        let secret = FieldElement::from(31337u64);
        let borrower = address_to_field(&[0x11; 20]);

        let mut tree = AllowlistTree::new(depth).unwrap();
        tree.insert(FieldElement::from(5u64)).unwrap();
        let index = tree.insert(compute_leaf(secret, borrower).unwrap()).unwrap();
        let root = tree.root();
        let path = tree.path(index).unwrap();

        Fixture {
            secret,
            path,
            public: PassPublicInputs {
                root,
                nullifier: compute_nullifier(secret, borrower, nonce).unwrap(),
                borrower,
                nonce,
            },
        }
    }

    fn synthesize(circuit: PassCircuit) -> ConstraintSystemRef<FieldElement> {
        let cs = ConstraintSystem::<FieldElement>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs
    }

    #[test]
    fn test_pass_circuit_valid() {
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let f = fixture(8, 0);

        let cs = synthesize(PassCircuit::new(f.secret, f.path, f.public, suite));

        assert!(cs.is_satisfied().unwrap());
        assert_eq!(cs.num_instance_variables(), 1 + PUBLIC_INPUT_ORDER.len());
        println!("Constraints: {}", cs.num_constraints());
    }

    #[test]
    fn test_public_signals_follow_declared_order() {
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let f = fixture(6, 9);

        let cs = synthesize(PassCircuit::new(f.secret, f.path, f.public, suite));

        let instance = cs.borrow().unwrap().instance_assignment.clone();
        // Slot 0 is the constant one.
        assert_eq!(&instance[1..], f.public.to_field_elements().as_slice());
    }

    #[test]
    fn test_pass_circuit_wrong_secret() {
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let f = fixture(6, 0);

        let cs = synthesize(PassCircuit::new(
            f.secret + FieldElement::from(1u64),
            f.path,
            f.public,
            suite,
        ));

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_pass_circuit_stale_nullifier() {
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let f = fixture(6, 2);
        let mut public = f.public;
        // Nullifier derived for nonce 2 presented with nonce 3
        public.nonce = 3;

        let cs = synthesize(PassCircuit::new(f.secret, f.path, public, suite));

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_pass_circuit_wrong_root() {
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let f = fixture(6, 0);
        let mut public = f.public;
        public.root += FieldElement::from(1u64);

        let cs = synthesize(PassCircuit::new(f.secret, f.path, public, suite));

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_pass_circuit_depth_mismatch_rejected() {
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let f = fixture(6, 0);
        let mut circuit = PassCircuit::new(f.secret, f.path, f.public, suite);
        circuit.depth = 7;

        let cs = ConstraintSystem::<FieldElement>::new_ref();
        assert!(circuit.generate_constraints(cs).is_err());
    }
}
