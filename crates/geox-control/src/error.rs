//! # Error Types
//!
//! Admission errors come in two kinds. Structural errors mean the document is
//! not a ruleset at all. Semantic errors mean it is a well-formed ruleset
//! that reaches outside the constitution or its own declarations. Both are
//! fatal and deterministic for the same bytes, so nothing here is retried.

use thiserror::Error;

use crate::template::TemplateId;

/// Classification used by callers that report errors upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    Semantic,
}

/// A ruleset document failed one of the admission gates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The bytes are not JSON.
    #[error("ruleset is not valid JSON: {0}")]
    MalformedJson(String),

    /// The JSON does not have the closed `control_ruleset_v0` shape.
    #[error("ruleset failed structural admission at {path}: {detail}")]
    Structural { path: String, detail: String },

    /// `action_code` is not in the action taxonomy.
    #[error("action_code not in AO taxonomy: {code}")]
    UnknownActionCode { code: String },

    /// An `inputs_used` entry is not an allowed input path.
    #[error("inputs_used contains a disallowed path: {path}")]
    DisallowedInputPath { path: String },

    /// A rule uses a template the ruleset did not list in `allowed_template_ids`.
    #[error("rule {rule_id}: template_id {template_id} is not in allowed_template_ids")]
    TemplateNotAllowed { rule_id: String, template_id: TemplateId },

    /// A rule declares one template and embeds another.
    #[error("rule {rule_id}: template_id {declared} does not match expr.template_id {embedded}")]
    TemplateMismatch {
        rule_id: String,
        declared: TemplateId,
        embedded: TemplateId,
    },

    /// A rule reads a field path missing from `inputs_used`.
    #[error("rule {rule_id}: expr references field_path not declared in inputs_used: {path}")]
    UndeclaredFieldPath { rule_id: String, path: String },
}

impl AdmissionError {
    /// Stable machine-readable code, as recorded in `INVALID` load results.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedJson(_) => "RULESET_JSON_INVALID",
            Self::Structural { .. } => "RULESET_ADMISSION_INVALID",
            Self::UnknownActionCode { .. } => "AO_ACTION_CODE_NOT_ALLOWED",
            Self::DisallowedInputPath { .. } => "INPUT_PATH_NOT_ALLOWED",
            Self::TemplateNotAllowed { .. } => "TEMPLATE_ID_NOT_ALLOWED",
            Self::TemplateMismatch { .. } => "TEMPLATE_ID_MISMATCH",
            Self::UndeclaredFieldPath { .. } => "INPUT_PATH_NOT_DECLARED_IN_INPUTS_USED",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedJson(_) | Self::Structural { .. } => ErrorKind::Structural,
            Self::UnknownActionCode { .. }
            | Self::DisallowedInputPath { .. }
            | Self::TemplateNotAllowed { .. }
            | Self::TemplateMismatch { .. }
            | Self::UndeclaredFieldPath { .. } => ErrorKind::Semantic,
        }
    }
}

/// Constitution lookups and table loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstitutionError {
    #[error("unknown action code: {code}")]
    UnknownActionCode { code: String },

    #[error("disallowed input path: {path}")]
    DisallowedPath { path: String },

    #[error("invalid constitution table: {0}")]
    InvalidTable(String),
}

impl From<ConstitutionError> for AdmissionError {
    fn from(err: ConstitutionError) -> Self {
        match err {
            ConstitutionError::UnknownActionCode { code } => Self::UnknownActionCode { code },
            ConstitutionError::DisallowedPath { path } => Self::DisallowedInputPath { path },
            ConstitutionError::InvalidTable(detail) => Self::Structural {
                path: "(constitution)".to_string(),
                detail,
            },
        }
    }
}

/// Evaluation refused before any rule was matched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// The ruleset's action is not among the permission set's candidate actions.
    #[error("action_code {action_code} is not in permission_set.candidate_actions")]
    ActionNotPermitted { action_code: String },
}

impl KernelError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ActionNotPermitted { .. } => "ACTION_CODE_NOT_IN_PERMISSION_SET",
        }
    }
}

/// An assembled verdict does not satisfy the closed `control_verdict_v0`
/// contract. Always a bug in whatever produced the verdict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerdictContractError {
    #[error("verdict violates control_verdict_v0 at {path}: {detail}")]
    Schema { path: String, detail: String },

    #[error("verdict subjectRef names no subject")]
    EmptySubject,

    #[error("verdict window is not well formed: startTs={start_ts}, endTs={end_ts}")]
    InvalidWindow { start_ts: i64, end_ts: i64 },

    /// Neither the `MISSING` sentinel nor a `sha256:<64 hex>` file ref.
    #[error("verdict ruleset_ref {ruleset_ref:?} is not a sha256 content ref")]
    InvalidRulesetRef { ruleset_ref: String },

    #[error("verdict could not be serialized: {0}")]
    Serialization(String),
}
