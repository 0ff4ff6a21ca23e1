//! # Lifecycle Constants
//!
//! Constants arrive as a free-form JSON object because fixtures written
//! over several iterations spell the keys differently. Each constant is
//! read from the first key in its alias list that holds a number.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::LifecycleError;

const MERGE_OVERLAP_RATIO_KEYS: &[&str] = &["MERGE_OVERLAP_RATIO", "merge_overlap_ratio", "mergeOverlapRatio"];
const EXPIRE_AFTER_MS_KEYS: &[&str] = &["EXPIRE_AFTER_MS", "expire_after_ms", "expireAfterMs"];
/// Older spelling of `EXPIRE_AFTER_MS`, consulted only when no primary key is set.
const EXPIRY_BUFFER_MS_KEYS: &[&str] = &["EXPIRY_BUFFER_MS", "expiry_buffer_ms", "expiryBufferMs"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LifecycleConstants {
    /// Overlap ratio at or above which a newer window supersedes an older one.
    pub merge_overlap_ratio: f64,
    /// Grace period after `window.endTs` before a state expires.
    pub expire_after_ms: f64,
}

impl LifecycleConstants {
    pub fn new(merge_overlap_ratio: f64, expire_after_ms: f64) -> Result<Self, LifecycleError> {
        if !merge_overlap_ratio.is_finite() {
            return Err(LifecycleError::InvalidConstant { name: "MERGE_OVERLAP_RATIO" });
        }
        if !expire_after_ms.is_finite() {
            return Err(LifecycleError::InvalidConstant { name: "EXPIRE_AFTER_MS" });
        }
        Ok(Self {
            merge_overlap_ratio,
            expire_after_ms,
        })
    }

    /// Resolve both constants from an object using the accepted key spellings.
    pub fn from_map(constants: &Map<String, Value>) -> Result<Self, LifecycleError> {
        let merge_overlap_ratio = pick_number(constants, MERGE_OVERLAP_RATIO_KEYS)
            .ok_or(LifecycleError::InvalidConstant { name: "MERGE_OVERLAP_RATIO" })?;
        let expire_after_ms = pick_number(constants, EXPIRE_AFTER_MS_KEYS)
            .or_else(|| pick_number(constants, EXPIRY_BUFFER_MS_KEYS))
            .ok_or(LifecycleError::InvalidConstant { name: "EXPIRE_AFTER_MS" })?;
        Self::new(merge_overlap_ratio, expire_after_ms)
    }
}

fn pick_number(constants: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| constants.get(*k).and_then(Value::as_f64))
        .find(|n| n.is_finite())
}
