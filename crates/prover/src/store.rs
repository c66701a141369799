//! Allowlist snapshot storage.
//!
//! The snapshot is a JSON array of canonical hex leaves in index order. It is
//! the only shared mutable state in the system: appends hold an exclusive lock
//! across load, insert and persist, and every write lands through a temp file
//! and rename so readers never observe a partial snapshot.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use zkpass_circuits::field;
use zkpass_circuits::{AllowlistTree, FieldElement};

use crate::error::{PassError, Result};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Leaf snapshot persistence.
pub trait LeafStore {
    /// Rebuild the tree from the current snapshot.
    fn load(&self, depth: usize) -> Result<AllowlistTree>;

    /// Append `leaf` and persist the snapshot, returning the updated tree and
    /// the index the leaf landed at.
    fn append_and_persist(&self, leaf: FieldElement, depth: usize) -> Result<(AllowlistTree, usize)>;
}

/// Write `bytes` to `path` via a temp file in the same directory and a rename.
///
/// The temp file is created owner-only, so the persisted file inherits those
/// permissions.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| PassError::storage(&dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| PassError::storage(&dir, e))?;
    tmp.write_all(bytes).map_err(|e| PassError::storage(path, e))?;
    tmp.as_file().sync_all().map_err(|e| PassError::storage(path, e))?;
    tmp.persist(path).map_err(|e| PassError::storage(path, e.error))?;
    Ok(())
}

/// Snapshot backed by a JSON file next to a `.lock` sibling.
#[derive(Debug, Clone)]
pub struct FileLeafStore {
    path: PathBuf,
    create_if_missing: bool,
    lock_timeout: Duration,
}

impl FileLeafStore {
    pub fn new(path: impl Into<PathBuf>, create_if_missing: bool, lock_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            create_if_missing,
            lock_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_leaves(&self) -> Result<Vec<FieldElement>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound && self.create_if_missing => {
                tracing::warn!(path = %self.path.display(), "no snapshot found, starting an empty allowlist at index 0");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PassError::storage(&self.path, e)),
        };

        let encoded: Vec<String> = serde_json::from_str(&content)
            .map_err(|e| PassError::storage(&self.path, format!("corrupt snapshot: {}", e)))?;

        encoded
            .iter()
            .enumerate()
            .map(|(i, s)| {
                field::from_hex(s).map_err(|e| {
                    PassError::storage(&self.path, format!("corrupt snapshot leaf {}: {}", i, e))
                })
            })
            .collect()
    }

    fn write_leaves(&self, leaves: &[FieldElement]) -> Result<()> {
        let encoded: Vec<String> = leaves.iter().map(field::to_hex).collect();
        let json = serde_json::to_vec_pretty(&encoded).map_err(|e| PassError::storage(&self.path, e))?;
        write_atomic(&self.path, &json)
    }
}

impl LeafStore for FileLeafStore {
    fn load(&self, depth: usize) -> Result<AllowlistTree> {
        let leaves = self.read_leaves()?;
        Ok(AllowlistTree::from_leaves(depth, &leaves)?)
    }

    fn append_and_persist(&self, leaf: FieldElement, depth: usize) -> Result<(AllowlistTree, usize)> {
        let _lock = FileLock::acquire(&self.path, self.lock_timeout)?;

        let mut tree = self.load(depth)?;
        let index = tree.insert(leaf)?;
        self.write_leaves(tree.leaves())?;

        tracing::debug!(
            path = %self.path.display(),
            leaf_index = index,
            size = tree.len(),
            "snapshot persisted"
        );
        Ok((tree, index))
    }
}

/// Exclusive `<path>.lock` sibling, held for a read-modify-write of `path`.
/// The lock file is removed on drop.
pub(crate) struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub(crate) fn lock_path(target: &Path) -> PathBuf {
        let mut name = target.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Poll for the lock until `timeout` elapses.
    pub(crate) fn acquire(target: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = Self::lock_path(target);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PassError::storage(parent, e))?;
        }
        let deadline = Instant::now() + timeout;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
                Ok(mut file) => {
                    let lock = FileLock { path: lock_path.clone() };
                    writeln!(file, "{}", std::process::id())
                        .map_err(|e| PassError::storage(&lock.path, e))?;
                    return Ok(lock);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(PassError::storage(
                            &lock_path,
                            format!(
                                "timed out after {:?} waiting for the lock; remove it if no other zkpass process is running",
                                timeout
                            ),
                        ));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(PassError::storage(&lock_path, e)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

/// In-process snapshot, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryLeafStore {
    leaves: Mutex<Vec<FieldElement>>,
}

impl MemoryLeafStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leaves(leaves: Vec<FieldElement>) -> Self {
        Self {
            leaves: Mutex::new(leaves),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Vec<FieldElement>>> {
        self.leaves
            .lock()
            .map_err(|_| PassError::storage("<memory>", "snapshot mutex poisoned"))
    }
}

impl LeafStore for MemoryLeafStore {
    fn load(&self, depth: usize) -> Result<AllowlistTree> {
        let leaves = self.guard()?;
        Ok(AllowlistTree::from_leaves(depth, &leaves)?)
    }

    fn append_and_persist(&self, leaf: FieldElement, depth: usize) -> Result<(AllowlistTree, usize)> {
        let mut leaves = self.guard()?;
        let mut tree = AllowlistTree::from_leaves(depth, &leaves)?;
        let index = tree.insert(leaf)?;
        leaves.push(leaf);
        Ok((tree, index))
    }
}
