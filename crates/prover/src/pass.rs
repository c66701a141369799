//! Pass records and their JSON wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zkpass_circuits::field::{self, ADDRESS_BYTES};
use zkpass_circuits::merkle::MAX_DEPTH;
use zkpass_circuits::{
    compute_leaf, compute_nullifier, FieldElement, MerklePath, PassPublicInputs,
};

use crate::error::{PassError, Result};

/// A 20-byte borrower address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Big-endian integer value of the address, as hashed into leaves.
    pub fn to_field(&self) -> FieldElement {
        field::address_to_field(&self.0)
    }
}

impl FromStr for Address {
    type Err = PassError;

    /// Accepts `0x` followed by exactly 40 hex digits, in any case.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .filter(|d| d.len() == 2 * ADDRESS_BYTES)
            .ok_or_else(|| PassError::InvalidAddress(s.to_string()))?;

        let mut bytes = [0u8; ADDRESS_BYTES];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| PassError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// An issued pass. Holding one is equivalent to holding a private key.
#[derive(Clone, PartialEq, Eq)]
pub struct Pass {
    pub borrower: Address,
    pub secret: FieldElement,
    pub leaf: FieldElement,
    pub leaf_index: u64,
    pub root: FieldElement,
    pub path: MerklePath,
    pub nonce: u64,
    pub nullifier: FieldElement,
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("borrower", &self.borrower)
            .field("secret", &"<redacted>")
            .field("leaf", &field::to_hex(&self.leaf))
            .field("leaf_index", &self.leaf_index)
            .field("root", &field::to_hex(&self.root))
            .field("depth", &self.depth())
            .field("nonce", &self.nonce)
            .field("nullifier", &field::to_hex(&self.nullifier))
            .finish()
    }
}

impl Pass {
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    /// The statement a proof for this pass is checked against.
    pub fn public_inputs(&self) -> PassPublicInputs {
        PassPublicInputs {
            root: self.root,
            nullifier: self.nullifier,
            borrower: self.borrower.to_field(),
            nonce: self.nonce,
        }
    }

    /// Re-derive everything derivable from `secret`, `borrower`, `nonce` and
    /// the path, and reject the pass on any disagreement.
    pub fn check_integrity(&self) -> Result<()> {
        let borrower = self.borrower.to_field();

        if compute_leaf(self.secret, borrower)? != self.leaf {
            return Err(PassError::Witness(
                "leaf does not match H2(secret, borrower)".into(),
            ));
        }

        if compute_nullifier(self.secret, borrower, self.nonce)? != self.nullifier {
            return Err(PassError::Witness(format!(
                "nullifier does not match nonce {}",
                self.nonce
            )));
        }

        let encoded = self.path.leaf_index().ok_or_else(|| {
            PassError::Witness(format!(
                "path indices of depth {} do not encode a leaf index",
                self.depth()
            ))
        })?;
        if encoded != self.leaf_index {
            return Err(PassError::Witness(format!(
                "path indices encode leaf {} but pass records leaf {}",
                encoded, self.leaf_index
            )));
        }

        if self.path.compute_root(self.leaf)? != self.root {
            return Err(PassError::Witness(
                "authentication path does not lead to the recorded root".into(),
            ));
        }

        Ok(())
    }

    pub fn to_file(&self) -> PassFile {
        PassFile {
            borrower: self.borrower.to_string(),
            secret: field::to_hex(&self.secret),
            leaf: field::to_hex(&self.leaf),
            root: field::to_hex(&self.root),
            nullifier: field::to_hex(&self.nullifier),
            nonce: self.nonce.to_string(),
            depth: self.depth(),
            leaf_index: self.leaf_index,
            path_elements: self.path.siblings().iter().map(field::to_hex).collect(),
            path_indices: self.path.indices(),
        }
    }

    pub fn from_file(file: &PassFile) -> Result<Self> {
        let nonce = file
            .nonce
            .parse::<u64>()
            .map_err(|_| PassError::Witness(format!("nonce {:?} is not a u64", file.nonce)))?;

        if file.depth == 0 || file.depth > MAX_DEPTH {
            return Err(PassError::Witness(format!(
                "depth {} is outside 1..={}",
                file.depth, MAX_DEPTH
            )));
        }

        if file.path_elements.len() != file.depth || file.path_indices.len() != file.depth {
            return Err(PassError::Witness(format!(
                "depth {} but {} path elements and {} path indices",
                file.depth,
                file.path_elements.len(),
                file.path_indices.len()
            )));
        }

        let siblings = file
            .path_elements
            .iter()
            .map(|s| field::from_hex(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let path = MerklePath::from_indices(siblings, &file.path_indices)?;

        Ok(Self {
            borrower: file.borrower.parse()?,
            secret: field::from_hex(&file.secret)?,
            leaf: field::from_hex(&file.leaf)?,
            leaf_index: file.leaf_index,
            root: field::from_hex(&file.root)?,
            path,
            nonce,
            nullifier: field::from_hex(&file.nullifier)?,
        })
    }
}

/// On-disk pass layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassFile {
    pub borrower: String,
    pub secret: String,
    pub leaf: String,
    pub root: String,
    pub nullifier: String,
    pub nonce: String,
    pub depth: usize,
    pub leaf_index: u64,
    pub path_elements: Vec<String>,
    pub path_indices: Vec<u8>,
}
