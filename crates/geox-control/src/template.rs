//! # Template Expression Language
//!
//! The closed grammar a rule may use to describe when it fires. It has
//! eight node shapes under seven template ids and nothing else: no
//! arithmetic, no numeric comparison, no regex, no free-text matching.
//! Keeping the grammar this small makes "what can a rule possibly do" a
//! question admission review can answer exhaustively.
//!
//! `WindowMatch` deliberately carries no parameters. Any parameter would
//! be a place to smuggle a threshold.
//!
//! Every consumer (`collect_field_paths`, the kernel matcher, the wire
//! conversion) matches exhaustively, so adding a shape is a compile error
//! until each consumer handles it.
//!
//! ## Wire format
//!
//! ```text
//! {"template_id":"FIELD_EQ","field_path":P,"value":V}
//! {"template_id":"FIELD_IN","field_path":P,"values":[V..]}
//! {"template_id":"FIELD_EXISTS","field_path":P}
//! {"template_id":"SET_INTERSECTS","field_path":P,"values":[V..]}
//! {"template_id":"WINDOW_MATCH"}
//! {"template_id":"LOGICAL_AND","children":[E..]}
//! {"template_id":"LOGICAL_OR_NOT","op":"OR","children":[E..]}
//! {"template_id":"LOGICAL_OR_NOT","op":"NOT","child":E}
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Frozen template identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateId {
    FieldEq,
    FieldIn,
    FieldExists,
    SetIntersects,
    WindowMatch,
    LogicalAnd,
    LogicalOrNot,
}

impl TemplateId {
    pub const ALL: [TemplateId; 7] = [
        TemplateId::FieldEq,
        TemplateId::FieldIn,
        TemplateId::FieldExists,
        TemplateId::SetIntersects,
        TemplateId::WindowMatch,
        TemplateId::LogicalAnd,
        TemplateId::LogicalOrNot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FieldEq => "FIELD_EQ",
            Self::FieldIn => "FIELD_IN",
            Self::FieldExists => "FIELD_EXISTS",
            Self::SetIntersects => "SET_INTERSECTS",
            Self::WindowMatch => "WINDOW_MATCH",
            Self::LogicalAnd => "LOGICAL_AND",
            Self::LogicalOrNot => "LOGICAL_OR_NOT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A template expression tree.
///
/// Field paths are literal strings taken from the document; no node can
/// compute a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateExpr {
    /// Field holds exactly `value`.
    FieldEq { path: String, value: String },
    /// Field holds one of `values`.
    FieldIn { path: String, values: Vec<String> },
    /// Field is present and not null.
    FieldExists { path: String },
    /// Field is a set sharing at least one member with `values`.
    SetIntersects { path: String, values: Vec<String> },
    /// Subject window structurally matches the permitted window.
    WindowMatch,
    And { children: Vec<TemplateExpr> },
    Or { children: Vec<TemplateExpr> },
    Not { child: Box<TemplateExpr> },
}

impl TemplateExpr {
    /// Template id as written on the wire. `Or` and `Not` share
    /// `LOGICAL_OR_NOT`.
    pub fn template_id(&self) -> TemplateId {
        match self {
            Self::FieldEq { .. } => TemplateId::FieldEq,
            Self::FieldIn { .. } => TemplateId::FieldIn,
            Self::FieldExists { .. } => TemplateId::FieldExists,
            Self::SetIntersects { .. } => TemplateId::SetIntersects,
            Self::WindowMatch => TemplateId::WindowMatch,
            Self::And { .. } => TemplateId::LogicalAnd,
            Self::Or { .. } | Self::Not { .. } => TemplateId::LogicalOrNot,
        }
    }

    /// Every field path referenced anywhere in the tree.
    ///
    /// `WindowMatch` contributes none.
    pub fn collect_field_paths(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::FieldEq { path, .. }
            | Self::FieldIn { path, .. }
            | Self::FieldExists { path }
            | Self::SetIntersects { path, .. } => {
                out.insert(path.clone());
            }
            Self::WindowMatch => {}
            Self::And { children } | Self::Or { children } => {
                for c in children {
                    c.collect_into(out);
                }
            }
            Self::Not { child } => child.collect_into(out),
        }
    }

    /// Convert a JSON tree into a typed expression.
    ///
    /// Strict: unknown keys, missing keys, empty strings, and empty sets
    /// are all rejected. Errors carry a JSON pointer to the offending node.
    pub fn from_value(value: &Value) -> Result<Self, TemplateShapeError> {
        parse_node(value, "")
    }

    /// Wire representation.
    pub fn to_value(&self) -> Value {
        match self {
            Self::FieldEq { path, value } => {
                json!({"template_id": "FIELD_EQ", "field_path": path, "value": value})
            }
            Self::FieldIn { path, values } => {
                json!({"template_id": "FIELD_IN", "field_path": path, "values": values})
            }
            Self::FieldExists { path } => {
                json!({"template_id": "FIELD_EXISTS", "field_path": path})
            }
            Self::SetIntersects { path, values } => {
                json!({"template_id": "SET_INTERSECTS", "field_path": path, "values": values})
            }
            Self::WindowMatch => json!({"template_id": "WINDOW_MATCH"}),
            Self::And { children } => json!({
                "template_id": "LOGICAL_AND",
                "children": children.iter().map(Self::to_value).collect::<Vec<_>>(),
            }),
            Self::Or { children } => json!({
                "template_id": "LOGICAL_OR_NOT",
                "op": "OR",
                "children": children.iter().map(Self::to_value).collect::<Vec<_>>(),
            }),
            Self::Not { child } => json!({
                "template_id": "LOGICAL_OR_NOT",
                "op": "NOT",
                "child": child.to_value(),
            }),
        }
    }
}

impl Serialize for TemplateExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TemplateExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// A template node did not match any of the closed shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid template expression at {pointer}: {reason}")]
pub struct TemplateShapeError {
    /// JSON pointer relative to the expression root (empty for the root).
    pub pointer: String,
    pub reason: String,
}

fn shape_err(pointer: &str, reason: impl Into<String>) -> TemplateShapeError {
    TemplateShapeError {
        pointer: if pointer.is_empty() { "(root)".to_string() } else { pointer.to_string() },
        reason: reason.into(),
    }
}

fn parse_node(value: &Value, at: &str) -> Result<TemplateExpr, TemplateShapeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| shape_err(at, "expected an object"))?;
    let raw_id = obj
        .get("template_id")
        .and_then(Value::as_str)
        .ok_or_else(|| shape_err(at, "missing template_id"))?;
    let id = TemplateId::parse(raw_id)
        .ok_or_else(|| shape_err(at, format!("unknown template_id {raw_id:?}")))?;

    match id {
        TemplateId::FieldEq => {
            only_keys(obj, &["template_id", "field_path", "value"], at)?;
            Ok(TemplateExpr::FieldEq {
                path: non_empty_str(obj, "field_path", at)?,
                value: non_empty_str(obj, "value", at)?,
            })
        }
        TemplateId::FieldIn => {
            only_keys(obj, &["template_id", "field_path", "values"], at)?;
            Ok(TemplateExpr::FieldIn {
                path: non_empty_str(obj, "field_path", at)?,
                values: enum_set(obj, at)?,
            })
        }
        TemplateId::FieldExists => {
            only_keys(obj, &["template_id", "field_path"], at)?;
            Ok(TemplateExpr::FieldExists {
                path: non_empty_str(obj, "field_path", at)?,
            })
        }
        TemplateId::SetIntersects => {
            only_keys(obj, &["template_id", "field_path", "values"], at)?;
            Ok(TemplateExpr::SetIntersects {
                path: non_empty_str(obj, "field_path", at)?,
                values: enum_set(obj, at)?,
            })
        }
        TemplateId::WindowMatch => {
            only_keys(obj, &["template_id"], at)?;
            Ok(TemplateExpr::WindowMatch)
        }
        TemplateId::LogicalAnd => {
            only_keys(obj, &["template_id", "children"], at)?;
            Ok(TemplateExpr::And {
                children: children(obj, at)?,
            })
        }
        TemplateId::LogicalOrNot => match obj.get("op").and_then(Value::as_str) {
            Some("OR") => {
                only_keys(obj, &["template_id", "op", "children"], at)?;
                Ok(TemplateExpr::Or {
                    children: children(obj, at)?,
                })
            }
            Some("NOT") => {
                only_keys(obj, &["template_id", "op", "child"], at)?;
                let child = obj
                    .get("child")
                    .ok_or_else(|| shape_err(at, "NOT requires child"))?;
                Ok(TemplateExpr::Not {
                    child: Box::new(parse_node(child, &format!("{at}/child"))?),
                })
            }
            _ => Err(shape_err(at, "LOGICAL_OR_NOT requires op \"OR\" or \"NOT\"")),
        },
    }
}

fn only_keys(obj: &Map<String, Value>, allowed: &[&str], at: &str) -> Result<(), TemplateShapeError> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(extra) => Err(shape_err(at, format!("unexpected key {extra:?}"))),
        None => Ok(()),
    }
}

fn non_empty_str(obj: &Map<String, Value>, key: &str, at: &str) -> Result<String, TemplateShapeError> {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(shape_err(at, format!("{key} must be a non-empty string"))),
    }
}

fn enum_set(obj: &Map<String, Value>, at: &str) -> Result<Vec<String>, TemplateShapeError> {
    let arr = obj
        .get("values")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| shape_err(at, "values must be a non-empty array"))?;
    arr.iter()
        .map(|v| match v.as_str() {
            Some(s) if !s.is_empty() => Ok(s.to_string()),
            _ => Err(shape_err(at, "values must contain non-empty strings")),
        })
        .collect()
}

fn children(obj: &Map<String, Value>, at: &str) -> Result<Vec<TemplateExpr>, TemplateShapeError> {
    let arr = obj
        .get("children")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| shape_err(at, "children must be a non-empty array"))?;
    arr.iter()
        .enumerate()
        .map(|(i, c)| parse_node(c, &format!("{at}/children/{i}")))
        .collect()
}
