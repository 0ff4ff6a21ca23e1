//! # Evaluation Harness
//!
//! One entry point from a ruleset file to a contract-checked verdict.
//!
//! - `MISSING` / `INVALID`: a synthetic `UNDETERMINED` verdict. The kernel
//!   is never called on a ruleset that was not admitted.
//! - `APPLIED`: `subjectRef` and `window` are merged into the problem state
//!   as opaque anchors, the snapshot is projected, the kernel runs, and the
//!   verdict is stamped with the ruleset ref and status.
//!
//! Every verdict, synthetic or not, is re-parsed against
//! `control_verdict_v0` before it is returned.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use geox_control::kernel::{self, VerdictAnchors};
use geox_control::{
    project, Constitution, ControlVerdict, ProjectionInputs, RulesetStatus, VerdictStamp,
};
use geox_core::{SubjectRef, TimeWindow};

use crate::error::HarnessError;
use crate::loader::{load_ruleset, RulesetLoadResult};

/// Caller-supplied evaluation input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluateInput {
    #[serde(rename = "subjectRef")]
    pub subject_ref: SubjectRef,
    pub window: TimeWindow,
    pub action_code: String,
    #[serde(rename = "problemState")]
    pub problem_state: Value,
    #[serde(rename = "uncertaintyEnvelope", default)]
    pub uncertainty_envelope: Value,
    #[serde(rename = "permissionSet", default)]
    pub permission_set: Value,
}

impl EvaluateInput {
    fn anchors(&self) -> VerdictAnchors {
        VerdictAnchors {
            subject_ref: self.subject_ref.clone(),
            window: self.window,
        }
    }

    /// Problem state with `subjectRef` and `window` overwritten by the
    /// input anchors. A non-object problem state is treated as empty.
    fn anchored_problem_state(&self) -> Result<Value, HarnessError> {
        let mut merged = match &self.problem_state {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let subject = serde_json::to_value(&self.subject_ref).map_err(contract_serialization)?;
        let window = serde_json::to_value(self.window).map_err(contract_serialization)?;
        merged.insert("subjectRef".to_string(), subject);
        merged.insert("window".to_string(), window);
        Ok(Value::Object(merged))
    }
}

fn contract_serialization(e: serde_json::Error) -> HarnessError {
    HarnessError::Contract(geox_control::VerdictContractError::Serialization(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluateResult {
    pub verdict: ControlVerdict,
    /// Mirrors `verdict.ruleset_status`.
    pub ruleset_status: RulesetStatus,
}

/// Evaluate with a fresh verdict id and the current time.
pub fn evaluate(
    path: &Path,
    input: &EvaluateInput,
    constitution: &Constitution,
) -> Result<EvaluateResult, HarnessError> {
    evaluate_with_stamp(path, input, constitution, VerdictStamp::now())
}

/// Evaluate with a caller-supplied stamp. Same bytes, same input and same
/// stamp always give the same result.
pub fn evaluate_with_stamp(
    path: &Path,
    input: &EvaluateInput,
    constitution: &Constitution,
    stamp: VerdictStamp,
) -> Result<EvaluateResult, HarnessError> {
    let loaded = load_ruleset(path, constitution)?;
    evaluate_loaded(&loaded, input, constitution, stamp)
}

/// Evaluate against an already resolved ruleset.
pub fn evaluate_loaded(
    loaded: &RulesetLoadResult,
    input: &EvaluateInput,
    constitution: &Constitution,
    stamp: VerdictStamp,
) -> Result<EvaluateResult, HarnessError> {
    let status = loaded.status();
    let assembled = match loaded {
        RulesetLoadResult::Applied { ruleset_ref, ruleset } => {
            let problem_state = input.anchored_problem_state()?;
            let snapshot = project(
                constitution,
                ProjectionInputs {
                    problem_state: &problem_state,
                    uncertainty_envelope: &input.uncertainty_envelope,
                    permission_set: &input.permission_set,
                },
            );
            let mut verdict = kernel::evaluate(ruleset, &snapshot, &input.anchors(), stamp)?
                .into_control_verdict();
            verdict.ruleset_ref = Some(ruleset_ref.clone());
            verdict.ruleset_status = Some(status);
            verdict
        }
        RulesetLoadResult::Missing | RulesetLoadResult::Invalid { .. } => ControlVerdict::synthetic(
            stamp,
            input.subject_ref.clone(),
            input.window,
            input.action_code.clone(),
            loaded.ruleset_ref(),
            status,
        ),
    };

    let verdict = assembled.revalidate()?;
    Ok(EvaluateResult {
        verdict,
        ruleset_status: status,
    })
}

/// Best-effort check: `false` when the file is missing, unreadable or not
/// admissible. Not for control decisions.
pub fn is_ruleset_file(path: &Path, constitution: &Constitution) -> bool {
    matches!(load_ruleset(path, constitution), Ok(RulesetLoadResult::Applied { .. }))
}
