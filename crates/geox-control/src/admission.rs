//! # RuleSet Admission
//!
//! Turns untrusted JSON into an [`AdmittedRuleSet`]. Gates run in a fixed
//! order and the first failure wins:
//!
//! 1. structural: embedded `control_ruleset_v0` schema, then strict typed
//!    conversion
//! 2. action code: `action_code` is in the constitution's taxonomy
//! 3. input paths: every `inputs_used` entry is an allowed input path
//! 4. template allow: every rule's `template_id` is in the ruleset's own
//!    `allowed_template_ids`, and equals the template id of its `expr`
//! 5. dependency closure: every field path read anywhere in a rule's
//!    `expr` is declared in `inputs_used`
//!
//! Each gate is a public function over the typed ruleset so it can be
//! exercised on its own.

use serde_json::Value;

use geox_schema::{SchemaName, SchemaRegistry, SchemaValidationError, ROOT_LOCATION};

use crate::constitution::Constitution;
use crate::error::AdmissionError;
use crate::ruleset::{AdmittedRuleSet, RuleSet};

/// Admit a ruleset from raw file bytes.
pub fn validate_bytes(bytes: &[u8], constitution: &Constitution) -> Result<AdmittedRuleSet, AdmissionError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        let err = AdmissionError::MalformedJson(e.to_string());
        tracing::debug!(code = err.code(), error = %err, "ruleset admission rejected");
        err
    })?;
    validate(&value, constitution)
}

/// Admit a ruleset from a parsed JSON tree.
pub fn validate(value: &Value, constitution: &Constitution) -> Result<AdmittedRuleSet, AdmissionError> {
    let result = run_gates(value, constitution);
    match &result {
        Ok(admitted) => tracing::debug!(
            ruleset_id = %admitted.ruleset_id,
            rules = admitted.rules.len(),
            "ruleset admitted"
        ),
        Err(err) => tracing::debug!(code = err.code(), error = %err, "ruleset admission rejected"),
    }
    result
}

/// Best-effort check. Never use the answer for a control decision; call
/// [`validate`] and keep the error instead.
pub fn is_control_ruleset(value: &Value, constitution: &Constitution) -> bool {
    run_gates(value, constitution).is_ok()
}

fn run_gates(value: &Value, constitution: &Constitution) -> Result<AdmittedRuleSet, AdmissionError> {
    let ruleset = check_structure(value)?;
    check_action_code(&ruleset, constitution)?;
    check_input_paths(&ruleset, constitution)?;
    check_templates_allowed(&ruleset)?;
    check_template_fidelity(&ruleset)?;
    check_dependency_closure(&ruleset)?;
    Ok(AdmittedRuleSet::new_unchecked(ruleset))
}

/// Gate 1.
pub fn check_structure(value: &Value) -> Result<RuleSet, AdmissionError> {
    let registry = SchemaRegistry::embedded().map_err(structural)?;
    registry
        .validate(SchemaName::ControlRulesetV0, value)
        .map_err(structural)?;
    serde_json::from_value(value.clone()).map_err(|e| AdmissionError::Structural {
        path: ROOT_LOCATION.to_string(),
        detail: e.to_string(),
    })
}

fn structural(err: SchemaValidationError) -> AdmissionError {
    AdmissionError::Structural {
        path: err.location(),
        detail: err.to_string(),
    }
}

/// Gate 2.
pub fn check_action_code(ruleset: &RuleSet, constitution: &Constitution) -> Result<(), AdmissionError> {
    constitution.assert_valid_action_code(&ruleset.action_code)?;
    Ok(())
}

/// Gate 3.
pub fn check_input_paths(ruleset: &RuleSet, constitution: &Constitution) -> Result<(), AdmissionError> {
    for path in &ruleset.inputs_used {
        constitution.assert_allowed_input_path(path)?;
    }
    Ok(())
}

/// Gate 4, first half.
pub fn check_templates_allowed(ruleset: &RuleSet) -> Result<(), AdmissionError> {
    for rule in &ruleset.rules {
        if !ruleset.allowed_template_ids.contains(&rule.template_id) {
            return Err(AdmissionError::TemplateNotAllowed {
                rule_id: rule.rule_id.clone(),
                template_id: rule.template_id,
            });
        }
    }
    Ok(())
}

/// Gate 4, second half: `rule.template_id == rule.expr.template_id`.
pub fn check_template_fidelity(ruleset: &RuleSet) -> Result<(), AdmissionError> {
    for rule in &ruleset.rules {
        let embedded = rule.expr.template_id();
        if rule.template_id != embedded {
            return Err(AdmissionError::TemplateMismatch {
                rule_id: rule.rule_id.clone(),
                declared: rule.template_id,
                embedded,
            });
        }
    }
    Ok(())
}

/// Gate 5.
pub fn check_dependency_closure(ruleset: &RuleSet) -> Result<(), AdmissionError> {
    let declared = ruleset.declared_inputs();
    for rule in &ruleset.rules {
        if let Some(path) = rule
            .expr
            .collect_field_paths()
            .into_iter()
            .find(|p| !declared.contains(p.as_str()))
        {
            return Err(AdmissionError::UndeclaredFieldPath {
                rule_id: rule.rule_id.clone(),
                path,
            });
        }
    }
    Ok(())
}
