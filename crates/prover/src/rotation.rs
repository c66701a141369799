//! Nonce rotation.

use std::path::Path;

use zkpass_circuits::compute_nullifier;
use zkpass_circuits::field;

use crate::error::{PassError, Result};
use crate::pass::Pass;
use crate::secret_store::SecretStore;

/// Advance the nonce and re-derive the nullifier. Nothing else changes and the
/// tree is not touched; the caller must persist the result before using it.
pub fn rotate(pass: &Pass) -> Result<Pass> {
    let nonce = pass
        .nonce
        .checked_add(1)
        .ok_or_else(|| PassError::Witness("nonce is exhausted".into()))?;
    let nullifier = compute_nullifier(pass.secret, pass.borrower.to_field(), nonce)?;

    Ok(Pass {
        nonce,
        nullifier,
        ..pass.clone()
    })
}

/// Rotate the pass stored at `path` and write it back.
///
/// Concurrent rotations of one file are last-writer-wins.
pub fn rotate_in_place<P: SecretStore>(passes: &P, path: &Path) -> Result<Pass> {
    let pass = passes.load(path)?;
    let rotated = rotate(&pass)?;
    passes.save(path, &rotated)?;

    tracing::info!(
        nonce = rotated.nonce,
        nullifier = %field::to_hex(&rotated.nullifier),
        "rotated pass"
    );
    Ok(rotated)
}
