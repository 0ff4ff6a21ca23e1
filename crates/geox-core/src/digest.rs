//! # Content Digest — `sha256:<hex>` Refs
//!
//! A ruleset file is identified in every verdict by the SHA-256 of its
//! bytes exactly as read from disk. Reformatting the file, even without
//! changing its meaning, yields a new ref. Verdicts read back through the
//! strict verdict parser must carry a ref that [`ContentDigest::parse_ref()`]
//! accepts.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::GeoxError;

const SHA256_PREFIX: &str = "sha256:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Sha256,
}

impl DigestAlgorithm {
    /// Ref prefix, without the trailing colon.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 32-byte digest tagged with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    pub algorithm: DigestAlgorithm,
    pub bytes: [u8; 32],
}

impl ContentDigest {
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// The `sha256:<hex>` form written into `ruleset_ref`.
    pub fn to_ref(&self) -> String {
        self.to_string()
    }

    /// Inverse of [`ContentDigest::to_ref()`]. Uppercase hex is rejected so
    /// that every digest has exactly one textual ref.
    ///
    /// # Errors
    ///
    /// [`GeoxError::InvalidDigest`] when the prefix, length, or alphabet is
    /// wrong.
    pub fn parse_ref(s: &str) -> Result<Self, GeoxError> {
        let invalid = || GeoxError::InvalidDigest(s.to_string());
        let digits = s.strip_prefix(SHA256_PREFIX).ok_or_else(invalid)?;
        if digits.bytes().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid());
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid())?;
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Digest of `data` taken verbatim.
pub fn sha256_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest::new(DigestAlgorithm::Sha256, Sha256::digest(data).into())
}
