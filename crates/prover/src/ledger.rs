//! Record of nullifiers that have already been handed out in calldata.
//!
//! The file on disk is authoritative. Every check re-reads it, and `record`
//! holds the `.lock` sibling across re-read, insert and write.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use zkpass_circuits::field;
use zkpass_circuits::FieldElement;

use crate::config::DEFAULT_LOCK_TIMEOUT_MS;
use crate::error::{PassError, Result};
use crate::store::{write_atomic, FileLock};

/// JSON array of canonical hex nullifiers.
#[derive(Debug, Clone)]
pub struct NullifierLedger {
    path: PathBuf,
    lock_timeout: Duration,
    spent: BTreeSet<String>,
}

impl NullifierLedger {
    /// Open the ledger at `path`; a missing file is an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let spent = read_spent(&path)?;
        Ok(Self {
            path,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            spent,
        })
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries as of the last read.
    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }

    pub fn contains(&self, nullifier: &FieldElement) -> bool {
        self.spent.contains(&field::to_hex(nullifier))
    }

    /// Fails if `nullifier` is on disk or was recorded through this handle.
    pub fn ensure_unused(&self, nullifier: &FieldElement) -> Result<()> {
        let key = field::to_hex(nullifier);
        if self.spent.contains(&key) || read_spent(&self.path)?.contains(&key) {
            return Err(PassError::NullifierReused(key));
        }
        Ok(())
    }

    /// Mark `nullifier` as submitted and persist the ledger.
    pub fn record(&mut self, nullifier: &FieldElement) -> Result<()> {
        let _lock = FileLock::acquire(&self.path, self.lock_timeout)?;

        let mut spent = read_spent(&self.path)?;
        let key = field::to_hex(nullifier);
        if !spent.insert(key.clone()) {
            self.spent = spent;
            return Err(PassError::NullifierReused(key));
        }

        let entries: Vec<&String> = spent.iter().collect();
        let json = serde_json::to_vec_pretty(&entries).map_err(|e| PassError::storage(&self.path, e))?;
        write_atomic(&self.path, &json)?;
        self.spent = spent;
        Ok(())
    }
}

fn read_spent(path: &Path) -> Result<BTreeSet<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str::<Vec<String>>(&content)
            .map_err(|e| PassError::storage(path, format!("corrupt ledger: {}", e)))?
            .into_iter()
            .collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(PassError::storage(path, e)),
    }
}
