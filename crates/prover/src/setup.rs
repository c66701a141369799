//! Circuit-specific Groth16 key generation and key files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use zkpass_circuits::{PassCircuit, PoseidonSuite};

use crate::error::{PassError, Result};
use crate::store::write_atomic;

/// Proving and verifying keys for the pass circuit at one depth.
#[derive(Clone)]
pub struct CircuitKeys {
    pub depth: usize,
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

pub fn proving_key_path(dir: &Path, depth: usize) -> PathBuf {
    dir.join(format!("pass_d{}_pk.bin", depth))
}

pub fn verifying_key_path(dir: &Path, depth: usize) -> PathBuf {
    dir.join(format!("pass_d{}_vk.bin", depth))
}

impl CircuitKeys {
    /// Run the circuit-specific setup for `depth`.
    pub fn generate<R: RngCore + CryptoRng>(
        depth: usize,
        poseidon: Arc<PoseidonSuite>,
        rng: &mut R,
    ) -> Result<Self> {
        tracing::info!(depth, "running Groth16 setup for the pass circuit");
        let circuit = PassCircuit::empty(depth, poseidon);
        let (proving_key, verifying_key) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)
            .map_err(|e| PassError::Prover(format!("setup failed: {}", e)))?;

        Ok(Self {
            depth,
            proving_key,
            verifying_key,
        })
    }

    pub fn prepared_verifying_key(&self) -> PreparedVerifyingKey<Bn254> {
        ark_groth16::prepare_verifying_key(&self.verifying_key)
    }

    /// Write both keys, compressed, into `dir`.
    pub fn save_to_directory(&self, dir: &Path) -> Result<()> {
        let pk_path = proving_key_path(dir, self.depth);
        let mut pk_bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut pk_bytes)
            .map_err(|e| PassError::storage(&pk_path, e))?;
        write_atomic(&pk_path, &pk_bytes)?;

        let vk_path = verifying_key_path(dir, self.depth);
        let mut vk_bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut vk_bytes)
            .map_err(|e| PassError::storage(&vk_path, e))?;
        write_atomic(&vk_path, &vk_bytes)?;

        tracing::info!(
            dir = %dir.display(),
            depth = self.depth,
            pk_bytes = pk_bytes.len(),
            vk_bytes = vk_bytes.len(),
            "circuit keys saved"
        );
        Ok(())
    }

    pub fn load_from_directory(dir: &Path, depth: usize) -> Result<Self> {
        Ok(Self {
            depth,
            proving_key: load_proving_key(dir, depth)?,
            verifying_key: load_verifying_key(dir, depth)?,
        })
    }
}

/// Load the proving key for `depth`. Any failure is `ProvingKeyUnavailable`.
pub fn load_proving_key(dir: &Path, depth: usize) -> Result<ProvingKey<Bn254>> {
    let path = proving_key_path(dir, depth);
    let bytes = std::fs::read(&path).map_err(|e| PassError::ProvingKeyUnavailable {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    // Our own artifact; skip the per-point subgroup checks.
    ProvingKey::<Bn254>::deserialize_compressed_unchecked(bytes.as_slice()).map_err(|e| {
        PassError::ProvingKeyUnavailable {
            path,
            reason: format!("undecodable key: {}", e),
        }
    })
}

pub fn load_verifying_key(dir: &Path, depth: usize) -> Result<VerifyingKey<Bn254>> {
    let path = verifying_key_path(dir, depth);
    let bytes = std::fs::read(&path).map_err(|e| PassError::storage(&path, e))?;
    VerifyingKey::<Bn254>::deserialize_compressed(bytes.as_slice())
        .map_err(|e| PassError::storage(&path, format!("undecodable key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_key_paths_are_depth_specific() {
        let dir = Path::new("build/keys");
        assert_eq!(proving_key_path(dir, 20), PathBuf::from("build/keys/pass_d20_pk.bin"));
        assert_eq!(verifying_key_path(dir, 4), PathBuf::from("build/keys/pass_d4_vk.bin"));
    }

    #[test]
    fn test_save_and_load_keys() {
        let mut rng = StdRng::seed_from_u64(42);
        let suite = Arc::new(PoseidonSuite::new().unwrap());
        let keys = CircuitKeys::generate(4, suite, &mut rng).unwrap();

        let dir = tempfile::tempdir().unwrap();
        keys.save_to_directory(dir.path()).unwrap();

        let loaded = CircuitKeys::load_from_directory(dir.path(), 4).unwrap();
        assert_eq!(loaded.verifying_key, keys.verifying_key);
        assert_eq!(loaded.proving_key.vk, keys.proving_key.vk);
    }

    #[test]
    fn test_missing_proving_key() {
        let dir = tempfile::tempdir().unwrap();
        match load_proving_key(dir.path(), 20) {
            Err(PassError::ProvingKeyUnavailable { path, .. }) => {
                assert!(path.ends_with("pass_d20_pk.bin"));
            }
            other => panic!("expected ProvingKeyUnavailable, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_truncated_proving_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(proving_key_path(dir.path(), 3), [0u8; 17]).unwrap();
        assert!(matches!(
            load_proving_key(dir.path(), 3),
            Err(PassError::ProvingKeyUnavailable { .. })
        ));
    }
}
