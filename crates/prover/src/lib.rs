//! Pass lifecycle: issuance, nonce rotation, key management, Groth16
//! proving and Solidity calldata encoding.

pub mod calldata;
pub mod config;
pub mod error;
pub mod issuance;
pub mod ledger;
pub mod pass;
pub mod prove;
pub mod rotation;
pub mod secret_store;
pub mod setup;
pub mod store;
pub mod verify;

pub use calldata::{from_solidity_proof, scale_amount, to_solidity_proof, ProofCalldata, SolidityProof};
pub use config::Config;
pub use error::{PassError, Result};
pub use issuance::Issuer;
pub use ledger::NullifierLedger;
pub use pass::{Address, Pass, PassFile};
pub use prove::{check_public_signals, prove_pass, PassProof, ProofJob};
pub use rotation::{rotate, rotate_in_place};
pub use secret_store::{PlaintextPassStore, SecretStore};
pub use setup::CircuitKeys;
pub use store::{FileLeafStore, LeafStore, MemoryLeafStore};
pub use verify::{verify_calldata, verify_pass};
