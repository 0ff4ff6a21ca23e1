//! # Constitution Tables
//!
//! The frozen action taxonomy and the allow-list of readable input paths.
//! They are passed into admission and projection as a value rather than
//! held in a global, so a test or an operator can substitute a table
//! without touching process-wide state.
//!
//! Path matching is exact. There is no prefix shortcut: allowing
//! `problem_state.subjectRef` does not allow
//! `problem_state.subjectRef.projectId`.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::ConstitutionError;

/// AO taxonomy v0.
pub const AO_ACTION_CODES_V0: &[&str] = &[
    "AO-ENTER",
    "AO-APPLY",
    "AO-REMOVE",
    "AO-STRUCT",
    "AO-EXTRACT",
    "AO-SENSE",
];

/// Input paths a v0 ruleset may declare in `inputs_used`.
pub const ALLOWED_INPUT_PATHS_V0: &[&str] = &[
    "problem_state.subjectRef",
    "problem_state.subjectRef.projectId",
    "problem_state.subjectRef.groupId",
    "problem_state.subjectRef.plotId",
    "problem_state.subjectRef.blockId",
    "problem_state.window.startTs",
    "problem_state.window.endTs",
    "problem_state.problem_type",
    "problem_state.confidence",
    "problem_state.problem_scope",
    "problem_state.state_layer_hint",
    "problem_state.rate_class_hint",
    "problem_state.uncertainty_sources[]",
    "problem_state.supporting_evidence_refs[]",
    "uncertainty_envelope.problem_state_ref",
    "uncertainty_envelope.uncertainty_sources[]",
    "uncertainty_envelope.supporting_evidence_refs[]",
    "permission_set.subjectRef",
    "permission_set.subjectRef.projectId",
    "permission_set.subjectRef.groupId",
    "permission_set.subjectRef.plotId",
    "permission_set.subjectRef.blockId",
    "permission_set.window.startTs",
    "permission_set.window.endTs",
    "permission_set.scale",
    "permission_set.action_taxonomy_ref",
    "permission_set.candidate_actions[].action_code",
    "permission_set.supporting_evidence_refs[]",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constitution {
    action_codes: BTreeSet<String>,
    allowed_input_paths: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstitutionFile {
    action_codes: Vec<String>,
    allowed_input_paths: Vec<String>,
}

impl Constitution {
    /// The frozen v0 tables.
    pub fn v0() -> Self {
        Self {
            action_codes: AO_ACTION_CODES_V0.iter().map(|s| s.to_string()).collect(),
            allowed_input_paths: ALLOWED_INPUT_PATHS_V0.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn new(
        action_codes: impl IntoIterator<Item = impl Into<String>>,
        allowed_input_paths: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ConstitutionError> {
        let action_codes: BTreeSet<String> = action_codes.into_iter().map(Into::into).collect();
        let allowed_input_paths: BTreeSet<String> =
            allowed_input_paths.into_iter().map(Into::into).collect();
        if action_codes.is_empty() {
            return Err(ConstitutionError::InvalidTable("action_codes is empty".into()));
        }
        if allowed_input_paths.is_empty() {
            return Err(ConstitutionError::InvalidTable("allowed_input_paths is empty".into()));
        }
        if let Some(blank) = action_codes
            .iter()
            .chain(allowed_input_paths.iter())
            .find(|s| s.trim().is_empty())
        {
            return Err(ConstitutionError::InvalidTable(format!("blank entry {blank:?}")));
        }
        Ok(Self {
            action_codes,
            allowed_input_paths,
        })
    }

    /// Load tables from YAML with keys `action_codes` and `allowed_input_paths`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConstitutionError> {
        let file: ConstitutionFile =
            serde_yaml::from_str(yaml).map_err(|e| ConstitutionError::InvalidTable(e.to_string()))?;
        Self::new(file.action_codes, file.allowed_input_paths)
    }

    pub fn assert_valid_action_code(&self, code: &str) -> Result<(), ConstitutionError> {
        if self.action_codes.contains(code) {
            Ok(())
        } else {
            Err(ConstitutionError::UnknownActionCode { code: code.to_string() })
        }
    }

    pub fn assert_allowed_input_path(&self, path: &str) -> Result<(), ConstitutionError> {
        if self.allowed_input_paths.contains(path) {
            Ok(())
        } else {
            Err(ConstitutionError::DisallowedPath { path: path.to_string() })
        }
    }

    pub fn action_codes(&self) -> impl Iterator<Item = &str> {
        self.action_codes.iter().map(String::as_str)
    }

    pub fn allowed_input_paths(&self) -> impl Iterator<Item = &str> {
        self.allowed_input_paths.iter().map(String::as_str)
    }
}

impl Default for Constitution {
    fn default() -> Self {
        Self::v0()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v0_knows_every_ao_code() {
        let c = Constitution::v0();
        for code in AO_ACTION_CODES_V0 {
            assert!(c.assert_valid_action_code(code).is_ok());
        }
        assert_eq!(
            c.assert_valid_action_code("AO-FLY"),
            Err(ConstitutionError::UnknownActionCode { code: "AO-FLY".into() })
        );
    }

    #[test]
    fn path_matching_is_exact() {
        let c = Constitution::v0();
        assert!(c.assert_allowed_input_path("problem_state.subjectRef").is_ok());
        assert!(c.assert_allowed_input_path("problem_state").is_err());
        assert!(c.assert_allowed_input_path("problem_state.subjectRef.farmId").is_err());
        assert!(c.assert_allowed_input_path("problem_state.uncertainty_sources").is_err());
    }

    #[test]
    fn loads_yaml_table() {
        let yaml = "action_codes: [AO-SENSE]\nallowed_input_paths:\n  - problem_state.problem_type\n";
        let c = Constitution::from_yaml_str(yaml).unwrap();
        assert_eq!(c.action_codes().collect::<Vec<_>>(), vec!["AO-SENSE"]);
        assert!(c.assert_valid_action_code("AO-APPLY").is_err());
    }

    #[test]
    fn yaml_rejects_unknown_keys_and_empty_lists() {
        assert!(Constitution::from_yaml_str(
            "action_codes: [AO-SENSE]\nallowed_input_paths: [a]\nextra: 1\n"
        )
        .is_err());
        assert!(Constitution::from_yaml_str("action_codes: []\nallowed_input_paths: [a]\n").is_err());
    }
}
