//! Pass issuance: secret, leaf, insertion, path, nullifier.

use std::path::Path;

use rand::{CryptoRng, RngCore};
use zkpass_circuits::field::{self, random_secret};
use zkpass_circuits::{compute_leaf, compute_nullifier};

use crate::error::Result;
use crate::pass::{Address, Pass};
use crate::secret_store::SecretStore;
use crate::store::LeafStore;

/// Issues passes against one allowlist snapshot.
pub struct Issuer<S> {
    store: S,
    depth: usize,
}

impl<S: LeafStore> Issuer<S> {
    pub fn new(store: S, depth: usize) -> Self {
        Self { store, depth }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Issue a pass for `borrower`. The snapshot is persisted before this
    /// returns; the pass itself is not.
    pub fn issue<R: RngCore + CryptoRng>(&self, borrower: Address, rng: &mut R) -> Result<Pass> {
        let secret = random_secret(rng);
        let borrower_field = borrower.to_field();
        let leaf = compute_leaf(secret, borrower_field)?;

        let (tree, index) = self.store.append_and_persist(leaf, self.depth)?;

        let root = tree.root();
        let path = tree.path(index)?;
        let nonce = 0;
        let nullifier = compute_nullifier(secret, borrower_field, nonce)?;

        let pass = Pass {
            borrower,
            secret,
            leaf,
            leaf_index: index as u64,
            root,
            path,
            nonce,
            nullifier,
        };

        tracing::info!(
            borrower = %borrower,
            leaf_index = index,
            root = %field::to_hex(&root),
            nullifier = %field::to_hex(&nullifier),
            depth = self.depth,
            "issued pass"
        );
        Ok(pass)
    }

    /// Issue a pass and write it to `out`.
    ///
    /// If writing the pass fails the leaf stays in the snapshot without an
    /// owner; the error is still returned so the issuance is not reported.
    pub fn issue_to<R, P>(
        &self,
        borrower: Address,
        passes: &P,
        out: &Path,
        rng: &mut R,
    ) -> Result<Pass>
    where
        R: RngCore + CryptoRng,
        P: SecretStore,
    {
        let pass = self.issue(borrower, rng)?;
        if let Err(e) = passes.save(out, &pass) {
            tracing::error!(
                leaf_index = pass.leaf_index,
                path = %out.display(),
                "leaf was appended but the pass could not be written"
            );
            return Err(e);
        }
        Ok(pass)
    }
}
