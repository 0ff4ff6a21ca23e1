use thiserror::Error;

use geox_core::CanonicalizationError;

#[derive(Error, Debug, PartialEq)]
pub enum LifecycleError {
    /// A required constant is absent or not a finite number under any of
    /// its accepted spellings.
    #[error("constants.{name} must be a finite number")]
    InvalidConstant { name: &'static str },

    /// A `subjectRef` could not be rendered as canonical JSON.
    #[error("cannot canonicalize subjectRef of {problem_state_id}: {reason}")]
    GroupKey { problem_state_id: String, reason: String },
}

impl LifecycleError {
    pub(crate) fn group_key(problem_state_id: &str, err: CanonicalizationError) -> Self {
        Self::GroupKey {
            problem_state_id: problem_state_id.to_string(),
            reason: err.to_string(),
        }
    }
}
