//! Pass file persistence.

use std::path::Path;

use crate::error::{PassError, Result};
use crate::pass::{Pass, PassFile};
use crate::store::write_atomic;

/// Where pass records live. A pass holds its secret in the clear, so an
/// implementation decides how that secret is protected at rest.
pub trait SecretStore {
    fn load(&self, path: &Path) -> Result<Pass>;
    fn save(&self, path: &Path, pass: &Pass) -> Result<()>;
}

/// Pretty-printed JSON, written owner-only through an atomic rename.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextPassStore;

impl SecretStore for PlaintextPassStore {
    fn load(&self, path: &Path) -> Result<Pass> {
        let content = std::fs::read_to_string(path).map_err(|e| PassError::storage(path, e))?;
        let file: PassFile = serde_json::from_str(&content)
            .map_err(|e| PassError::storage(path, format!("malformed pass file: {}", e)))?;
        Pass::from_file(&file)
    }

    fn save(&self, path: &Path, pass: &Pass) -> Result<()> {
        let json = serde_json::to_vec_pretty(&pass.to_file()).map_err(|e| PassError::storage(path, e))?;
        write_atomic(path, &json)
    }
}
