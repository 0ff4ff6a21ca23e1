//! # Field Snapshot
//!
//! The flat `field path -> value` map the kernel reads from. It is built
//! by projecting three opaque input objects (`problem_state`,
//! `uncertainty_envelope`, `permission_set`) onto the constitution's
//! allowed input paths, so by construction it holds no key outside the
//! allow-list.
//!
//! Path resolution:
//!
//! - the first segment picks the root object
//! - plain segments descend into objects
//! - a segment `name[]` selects the array at `name`; if it is the last
//!   segment the array is taken whole, otherwise the remaining segments are
//!   resolved against each element (unresolvable elements become `null`)
//! - absent and `null` leaves are stored as absent

use std::collections::BTreeMap;

use serde_json::Value;

use crate::constitution::Constitution;
use crate::error::ConstitutionError;

pub const PROBLEM_STATE_WINDOW_START: &str = "problem_state.window.startTs";
pub const PROBLEM_STATE_WINDOW_END: &str = "problem_state.window.endTs";
pub const PERMISSION_WINDOW_START: &str = "permission_set.window.startTs";
pub const PERMISSION_WINDOW_END: &str = "permission_set.window.endTs";
pub const CANDIDATE_ACTION_CODES: &str = "permission_set.candidate_actions[].action_code";

/// The three objects a snapshot is projected from.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInputs<'a> {
    pub problem_state: &'a Value,
    pub uncertainty_envelope: &'a Value,
    pub permission_set: &'a Value,
}

impl<'a> ProjectionInputs<'a> {
    fn root(&self, name: &str) -> Option<&'a Value> {
        match name {
            "problem_state" => Some(self.problem_state),
            "uncertainty_envelope" => Some(self.uncertainty_envelope),
            "permission_set" => Some(self.permission_set),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSnapshot {
    values: BTreeMap<String, Value>,
}

impl FieldSnapshot {
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a snapshot from explicit pairs. Every key must be an allowed
    /// input path; `null` values are dropped.
    pub fn from_pairs(
        constitution: &Constitution,
        pairs: impl IntoIterator<Item = (impl Into<String>, Value)>,
    ) -> Result<Self, ConstitutionError> {
        let mut values = BTreeMap::new();
        for (path, value) in pairs {
            let path = path.into();
            constitution.assert_allowed_input_path(&path)?;
            if !value.is_null() {
                values.insert(path, value);
            }
        }
        Ok(Self { values })
    }
}

/// Project the inputs onto every allowed input path.
pub fn project(constitution: &Constitution, inputs: ProjectionInputs<'_>) -> FieldSnapshot {
    let values = constitution
        .allowed_input_paths()
        .filter_map(|path| resolve_path(&inputs, path).map(|v| (path.to_string(), v)))
        .collect();
    FieldSnapshot { values }
}

fn resolve_path(inputs: &ProjectionInputs<'_>, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (root, rest) = segments.split_first()?;
    resolve(inputs.root(root)?, rest)
}

fn resolve(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, tail)) = segments.split_first() else {
        return (!value.is_null()).then(|| value.clone());
    };
    if let Some(name) = head.strip_suffix("[]") {
        let items = value.get(name)?.as_array()?;
        if tail.is_empty() {
            return Some(Value::Array(items.clone()));
        }
        return Some(Value::Array(
            items
                .iter()
                .map(|item| resolve(item, tail).unwrap_or(Value::Null))
                .collect(),
        ));
    }
    resolve(value.get(*head)?, tail)
}
