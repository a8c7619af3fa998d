//! Checksum utilities for model bundles and compiled output

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::schema::ProtoFile;

/// SHA256 checksum
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn from_content(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Checksum of the canonical (compact JSON) form of a model.
    ///
    /// Field order follows the struct definitions and declaration order follows
    /// the model, so equal models always hash equal.
    pub fn of_model(files: &[ProtoFile]) -> Result<Self> {
        let canonical = serde_json::to_vec(files)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &str) -> bool {
        Self::from_content(content) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Incremental checksum over several inputs, in the order they are fed
#[derive(Default)]
pub struct BundleHasher(Sha256);

impl BundleHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, content: &str) {
        self.0.update(content.as_bytes());
    }

    pub fn finish(self) -> Checksum {
        Checksum(format!("{:x}", self.0.finalize()))
    }
}
