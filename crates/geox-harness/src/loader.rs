//! # RuleSet Loader
//!
//! Resolves a ruleset from an explicit file path. There is no directory
//! scan and no fallback location. Every outcome is a value:
//!
//! | outcome   | `ruleset_ref`               |
//! |-----------|-----------------------------|
//! | `APPLIED` | `sha256:<hex of file bytes>` |
//! | `MISSING` | `MISSING`                   |
//! | `INVALID` | `sha256:<hex of file bytes>` |
//!
//! The ref is computed from raw bytes, before parsing, so it can be
//! recomputed offline with `sha256sum` and does not depend on JSON
//! formatting or on the validator.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use geox_control::{validate_bytes, AdmissionError, AdmittedRuleSet, Constitution, RulesetStatus, MISSING_RULESET_REF};
use geox_core::sha256_bytes;

use crate::error::HarnessError;

#[derive(Debug, Clone)]
pub enum RulesetLoadResult {
    Applied {
        ruleset_ref: String,
        ruleset: AdmittedRuleSet,
    },
    Missing,
    Invalid {
        ruleset_ref: String,
        error: AdmissionError,
    },
}

impl RulesetLoadResult {
    pub fn status(&self) -> RulesetStatus {
        match self {
            Self::Applied { .. } => RulesetStatus::Applied,
            Self::Missing => RulesetStatus::Missing,
            Self::Invalid { .. } => RulesetStatus::Invalid,
        }
    }

    pub fn ruleset_ref(&self) -> &str {
        match self {
            Self::Applied { ruleset_ref, .. } | Self::Invalid { ruleset_ref, .. } => ruleset_ref,
            Self::Missing => MISSING_RULESET_REF,
        }
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { error, .. } => Some(error.code()),
            Self::Applied { .. } | Self::Missing => None,
        }
    }

    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            status: self.status(),
            ruleset_ref: self.ruleset_ref().to_string(),
            error_code: self.error_code(),
        }
    }
}

/// Serializable view of a load result, without the ruleset itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub status: RulesetStatus,
    pub ruleset_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

/// `sha256:<hex>` of raw ruleset bytes.
pub fn ruleset_ref_from_bytes(bytes: &[u8]) -> String {
    sha256_bytes(bytes).to_ref()
}

/// Classify bytes already in memory. Never `MISSING`.
pub fn load_ruleset_bytes(bytes: &[u8], constitution: &Constitution) -> RulesetLoadResult {
    let ruleset_ref = ruleset_ref_from_bytes(bytes);
    match validate_bytes(bytes, constitution) {
        Ok(ruleset) => RulesetLoadResult::Applied { ruleset_ref, ruleset },
        Err(error) => RulesetLoadResult::Invalid { ruleset_ref, error },
    }
}

/// Load and admit the ruleset at `path`.
///
/// # Errors
///
/// [`HarnessError::Io`] for read failures other than the file not
/// existing. A missing file is [`RulesetLoadResult::Missing`].
pub fn load_ruleset(path: &Path, constitution: &Constitution) -> Result<RulesetLoadResult, HarnessError> {
    let result = match fs::read(path) {
        Ok(bytes) => load_ruleset_bytes(&bytes, constitution),
        Err(e) if e.kind() == io::ErrorKind::NotFound => RulesetLoadResult::Missing,
        Err(source) => {
            return Err(HarnessError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    tracing::info!(
        path = %path.display(),
        status = %result.status(),
        ruleset_ref = result.ruleset_ref(),
        error_code = result.error_code(),
        "ruleset resolved"
    );
    Ok(result)
}
