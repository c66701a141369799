//! Error taxonomy for the pass lifecycle.

use std::path::PathBuf;

use thiserror::Error;
use zkpass_circuits::{FieldError, HashError, MerkleError};

/// Errors raised by issuance, rotation, proving and storage.
#[derive(Error, Debug)]
pub enum PassError {
    #[error("storage error at {path}: {reason}")]
    Storage { path: PathBuf, reason: String },

    #[error("allowlist tree is full: depth {depth} holds at most {capacity} leaves")]
    CapacityExceeded { depth: usize, capacity: u64 },

    #[error("leaf index {index} out of range for tree of size {size}")]
    IndexOutOfRange { index: u64, size: u64 },

    #[error("proving key unavailable at {path}: {reason}")]
    ProvingKeyUnavailable { path: PathBuf, reason: String },

    #[error("witness error: {0}")]
    Witness(String),

    #[error(
        "public input ordering mismatch: circuit reported {signal} = {reported}, pass records {expected}"
    )]
    PublicInputOrdering {
        signal: &'static str,
        reported: String,
        expected: String,
    },

    #[error("invalid field element: {0}")]
    Field(#[from] FieldError),

    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error("invalid borrower address {0:?}")]
    InvalidAddress(String),

    #[error("nullifier {0} has already been submitted; rotate the pass first")]
    NullifierReused(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("prover failed: {0}")]
    Prover(String),
}

impl PassError {
    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PassError::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<MerkleError> for PassError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::CapacityExceeded { depth, capacity } => {
                PassError::CapacityExceeded { depth, capacity }
            }
            MerkleError::IndexOutOfRange { index, size } => PassError::IndexOutOfRange { index, size },
            MerkleError::InvalidDepth(depth) => {
                PassError::Config(format!("unsupported tree depth {}", depth))
            }
            MerkleError::MalformedPath(reason) => PassError::Witness(reason),
            MerkleError::Hash(e) => PassError::Witness(e.to_string()),
        }
    }
}

impl From<HashError> for PassError {
    fn from(err: HashError) -> Self {
        PassError::Witness(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PassError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merkle_errors_map_onto_taxonomy() {
        let full: PassError = MerkleError::CapacityExceeded { depth: 3, capacity: 8 }.into();
        assert!(matches!(full, PassError::CapacityExceeded { depth: 3, capacity: 8 }));

        let range: PassError = MerkleError::IndexOutOfRange { index: 4, size: 2 }.into();
        assert!(matches!(range, PassError::IndexOutOfRange { index: 4, size: 2 }));

        let path: PassError = MerkleError::MalformedPath("bad".into()).into();
        assert!(matches!(path, PassError::Witness(_)));
    }

    #[test]
    fn test_ordering_message_names_signal() {
        let err = PassError::PublicInputOrdering {
            signal: "root",
            reported: "0x01".into(),
            expected: "0x02".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("root"));
        assert!(msg.contains("0x01"));
        assert!(msg.contains("0x02"));
    }
}
