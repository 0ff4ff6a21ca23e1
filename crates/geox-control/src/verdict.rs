//! # Verdict Contract
//!
//! `control_verdict_v0` is the only artifact the control plane emits. It is
//! closed: no explanation text, no priority, no score. Every verdict that
//! leaves the harness, synthetic or kernel-produced, goes through
//! [`parse_control_verdict`], which applies the embedded schema and then the
//! relational checks the schema cannot express.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use geox_core::{epoch_millis_now, ContentDigest, SubjectRef, TimeWindow};
use geox_schema::{SchemaName, SchemaRegistry, SchemaValidationError, ROOT_LOCATION};

use crate::error::VerdictContractError;
use crate::ruleset::Verdict;

/// `schema_version` stamped on emitted verdicts.
pub const VERDICT_SCHEMA_VERSION: &str = "0.1.0";

/// Sentinel `ruleset_ref` for a ruleset file that does not exist.
pub const MISSING_RULESET_REF: &str = "MISSING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictType {
    #[serde(rename = "control_verdict_v0")]
    ControlVerdictV0,
}

/// How the ruleset behind a verdict was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RulesetStatus {
    Applied,
    Missing,
    Invalid,
}

impl RulesetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "APPLIED",
            Self::Missing => "MISSING",
            Self::Invalid => "INVALID",
        }
    }
}

impl std::fmt::Display for RulesetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and time of a verdict.
///
/// Kept outside the kernel so evaluation stays a pure function of its
/// inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictStamp {
    pub verdict_id: String,
    pub evaluated_at_ts: i64,
}

impl VerdictStamp {
    /// Fresh random id and the current UTC time.
    pub fn now() -> Self {
        Self {
            verdict_id: format!("verdict_{}", Uuid::new_v4().simple()),
            evaluated_at_ts: epoch_millis_now(),
        }
    }

    pub fn fixed(verdict_id: impl Into<String>, evaluated_at_ts: i64) -> Self {
        Self {
            verdict_id: verdict_id.into(),
            evaluated_at_ts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlVerdict {
    #[serde(rename = "type")]
    pub doc_type: VerdictType,
    pub schema_version: String,
    pub verdict_id: String,
    pub evaluated_at_ts: i64,
    #[serde(rename = "subjectRef")]
    pub subject_ref: SubjectRef,
    pub window: TimeWindow,
    pub action_code: String,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset_status: Option<RulesetStatus>,
}

impl ControlVerdict {
    /// `UNDETERMINED` verdict for a ruleset that was never evaluated.
    pub fn synthetic(
        stamp: VerdictStamp,
        subject_ref: SubjectRef,
        window: TimeWindow,
        action_code: impl Into<String>,
        ruleset_ref: impl Into<String>,
        ruleset_status: RulesetStatus,
    ) -> Self {
        Self {
            doc_type: VerdictType::ControlVerdictV0,
            schema_version: VERDICT_SCHEMA_VERSION.to_string(),
            verdict_id: stamp.verdict_id,
            evaluated_at_ts: stamp.evaluated_at_ts,
            subject_ref,
            window,
            action_code: action_code.into(),
            verdict: Verdict::Undetermined,
            rule_ref: None,
            ruleset_ref: Some(ruleset_ref.into()),
            ruleset_status: Some(ruleset_status),
        }
    }

    /// Round-trip through the strict parser.
    pub fn revalidate(&self) -> Result<Self, VerdictContractError> {
        let value =
            serde_json::to_value(self).map_err(|e| VerdictContractError::Serialization(e.to_string()))?;
        parse_control_verdict(&value)
    }
}

/// Strict parser for `control_verdict_v0`.
pub fn parse_control_verdict(value: &Value) -> Result<ControlVerdict, VerdictContractError> {
    let registry = SchemaRegistry::embedded().map_err(schema_error)?;
    registry
        .validate(SchemaName::ControlVerdictV0, value)
        .map_err(schema_error)?;

    let verdict: ControlVerdict =
        serde_json::from_value(value.clone()).map_err(|e| VerdictContractError::Schema {
            path: ROOT_LOCATION.to_string(),
            detail: e.to_string(),
        })?;

    if verdict.subject_ref.is_empty() {
        return Err(VerdictContractError::EmptySubject);
    }
    if !verdict.window.is_well_formed() {
        return Err(VerdictContractError::InvalidWindow {
            start_ts: verdict.window.start_ts,
            end_ts: verdict.window.end_ts,
        });
    }
    if let Some(r) = verdict.ruleset_ref.as_deref() {
        if r != MISSING_RULESET_REF && ContentDigest::parse_ref(r).is_err() {
            return Err(VerdictContractError::InvalidRulesetRef {
                ruleset_ref: r.to_string(),
            });
        }
    }
    Ok(verdict)
}

fn schema_error(err: SchemaValidationError) -> VerdictContractError {
    VerdictContractError::Schema {
        path: err.location(),
        detail: err.to_string(),
    }
}
