//! Proof generation for passes.

use std::sync::Arc;
use std::thread::JoinHandle;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use zkpass_circuits::field;
use zkpass_circuits::{PassCircuit, PassPublicInputs, PoseidonSuite, PUBLIC_INPUT_ORDER};

use crate::error::{PassError, Result};
use crate::pass::Pass;

/// A proof together with the public signals the circuit reported.
#[derive(Clone, Debug)]
pub struct PassProof {
    pub proof: Proof<Bn254>,
    pub public_inputs: Vec<Fr>,
}

/// Compare reported public signals against the statement, slot by slot, in
/// `PUBLIC_INPUT_ORDER`.
pub fn check_public_signals(reported: &[Fr], expected: &PassPublicInputs) -> Result<()> {
    let expected = expected.to_field_elements();
    if reported.len() != expected.len() {
        return Err(PassError::PublicInputOrdering {
            signal: "public signal count",
            reported: reported.len().to_string(),
            expected: expected.len().to_string(),
        });
    }

    for ((name, got), want) in PUBLIC_INPUT_ORDER.iter().zip(reported).zip(&expected) {
        if got != want {
            return Err(PassError::PublicInputOrdering {
                signal: *name,
                reported: field::to_hex(got),
                expected: field::to_hex(want),
            });
        }
    }
    Ok(())
}

/// Synthesize the witness and return the public signals it assigns.
///
/// An unsatisfied system means the pass does not hold a valid witness.
fn synthesize_public_signals(circuit: PassCircuit) -> Result<Vec<Fr>> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit
        .generate_constraints(cs.clone())
        .map_err(|e| PassError::Witness(format!("synthesis failed: {}", e)))?;

    if !cs
        .is_satisfied()
        .map_err(|e| PassError::Witness(e.to_string()))?
    {
        let failing = cs.which_is_unsatisfied().ok().flatten().unwrap_or_default();
        return Err(PassError::Witness(format!(
            "constraint system is not satisfied ({})",
            failing
        )));
    }

    let cs = cs
        .borrow()
        .ok_or_else(|| PassError::Prover("constraint system is unavailable".into()))?;
    // Slot 0 is the constant one.
    Ok(cs.instance_assignment.iter().skip(1).copied().collect())
}

/// Prove knowledge of the pass secret and path for the pass's own statement.
///
/// The pass is re-derived first, then the circuit's public signals are checked
/// against the pass before any proof is produced.
pub fn prove_pass<R: RngCore + CryptoRng>(
    pk: &ProvingKey<Bn254>,
    pass: &Pass,
    poseidon: Arc<PoseidonSuite>,
    rng: &mut R,
) -> Result<PassProof> {
    pass.check_integrity()?;

    let public = pass.public_inputs();
    let circuit = PassCircuit::new(pass.secret, pass.path.clone(), public, poseidon);

    let reported = synthesize_public_signals(circuit.clone())?;
    check_public_signals(&reported, &public)?;

    tracing::debug!(
        depth = pass.depth(),
        root = %field::to_hex(&public.root),
        nullifier = %field::to_hex(&public.nullifier),
        "generating Groth16 proof"
    );
    let proof = Groth16::<Bn254>::prove(pk, circuit, rng)
        .map_err(|e| PassError::Prover(e.to_string()))?;

    Ok(PassProof {
        proof,
        public_inputs: reported,
    })
}

/// Proof generation running on a dedicated worker thread.
///
/// Dropping the job detaches the worker; its result is discarded.
pub struct ProofJob {
    handle: JoinHandle<Result<PassProof>>,
}

impl ProofJob {
    pub fn spawn(pk: Arc<ProvingKey<Bn254>>, pass: Pass, poseidon: Arc<PoseidonSuite>) -> Result<Self> {
        let handle = std::thread::Builder::new()
            .name("zkpass-prover".into())
            .spawn(move || {
                let mut rng = rand::rngs::OsRng;
                prove_pass(&pk, &pass, poseidon, &mut rng)
            })
            .map_err(|e| PassError::Prover(format!("failed to start worker: {}", e)))?;

        Ok(Self { handle })
    }

    /// Block until the worker is done.
    pub fn join(self) -> Result<PassProof> {
        self.handle
            .join()
            .map_err(|_| PassError::Prover("proving worker panicked".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::tests::sample_pass;
    use crate::setup::CircuitKeys;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_check_public_signals_names_first_mismatch() {
        let public = sample_pass(4).public_inputs();
        let mut reported = public.to_field_elements();
        check_public_signals(&reported, &public).unwrap();

        reported.swap(0, 1);
        match check_public_signals(&reported, &public) {
            Err(PassError::PublicInputOrdering { signal, .. }) => assert_eq!(signal, "root"),
            other => panic!("expected ordering error, got {:?}", other),
        }

        reported.truncate(3);
        assert!(matches!(
            check_public_signals(&reported, &public),
            Err(PassError::PublicInputOrdering { signal: "public signal count", .. })
        ));
    }

    #[test]
    fn test_reported_signals_match_pass() {
        let pass = sample_pass(5);
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let circuit = PassCircuit::new(pass.secret, pass.path.clone(), pass.public_inputs(), suite);

        let reported = synthesize_public_signals(circuit).unwrap();
        assert_eq!(reported, pass.public_inputs().to_field_elements());
    }

    #[test]
    fn test_prove_rejects_tampered_pass() {
        let mut rng = StdRng::seed_from_u64(5);
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let keys = CircuitKeys::generate(4, suite.clone(), &mut rng).unwrap();

        let mut pass = sample_pass(4);
        pass.nonce = 9;
        assert!(matches!(
            prove_pass(&keys.proving_key, &pass, suite, &mut rng),
            Err(PassError::Witness(_))
        ));
    }

    #[test]
    fn test_proof_job_returns_verifiable_proof() {
        let mut rng = StdRng::seed_from_u64(6);
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let keys = CircuitKeys::generate(4, suite.clone(), &mut rng).unwrap();
        let pass = sample_pass(4);

        let job = ProofJob::spawn(Arc::new(keys.proving_key.clone()), pass.clone(), suite).unwrap();
        let result = job.join().unwrap();

        assert_eq!(result.public_inputs, pass.public_inputs().to_field_elements());
        assert!(Groth16::<Bn254>::verify(&keys.verifying_key, &result.public_inputs, &result.proof).unwrap());
    }
}
