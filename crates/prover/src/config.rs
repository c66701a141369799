//! `zkpass.toml` configuration.
//!
//! Every section is optional; a missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zkpass_circuits::DEFAULT_DEPTH;

use crate::error::{PassError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "zkpass.toml";

const DEFAULT_SNAPSHOT_FILE: &str = "allowlist.leaves.json";
pub(crate) const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;
const DEFAULT_KEYS_DIR: &str = "build/keys";
const DEFAULT_CALLDATA_FILE: &str = "proofCalldata.json";
const DEFAULT_LEDGER_FILE: &str = "nullifiers.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub proving: ProvingConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default = "default_snapshot")]
    pub snapshot: PathBuf,
    /// Treat an absent snapshot as an empty tree (first issuance).
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_pass_dir")]
    pub pass_dir: PathBuf,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvingConfig {
    #[serde(default = "default_keys_dir")]
    pub keys_dir: PathBuf,
    #[serde(default = "default_calldata_output")]
    pub calldata_output: PathBuf,
    #[serde(default = "default_true")]
    pub verify_after_prove: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            snapshot: default_snapshot(),
            create_if_missing: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pass_dir: default_pass_dir(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl Default for ProvingConfig {
    fn default() -> Self {
        Self {
            keys_dir: default_keys_dir(),
            calldata_output: default_calldata_output(),
            verify_after_prove: true,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            enabled: true,
        }
    }
}

fn default_depth() -> usize {
    DEFAULT_DEPTH
}

fn default_snapshot() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_FILE)
}

fn default_true() -> bool {
    true
}

fn default_pass_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_keys_dir() -> PathBuf {
    PathBuf::from(DEFAULT_KEYS_DIR)
}

fn default_calldata_output() -> PathBuf {
    PathBuf::from(DEFAULT_CALLDATA_FILE)
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_FILE)
}

impl StorageConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PassError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            PassError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tree.depth == 0 || self.tree.depth > zkpass_circuits::merkle::MAX_DEPTH {
            return Err(PassError::Config(format!(
                "tree.depth must be between 1 and {}, got {}",
                zkpass_circuits::merkle::MAX_DEPTH,
                self.tree.depth
            )));
        }
        Ok(())
    }
}
