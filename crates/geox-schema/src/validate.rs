//! # Contract Validation
//!
//! Both contracts are compiled as Draft 2020-12 the first time they are
//! needed and then shared for the life of the process. Validation reports
//! every violation found, each located by a JSON pointer into the
//! instance, so a rejected ruleset can be fixed in one pass.
//!
//! Schema text is embedded with `include_str!`. Only local `$defs` are
//! referenced, so compiling never touches the filesystem or the network.

use std::fmt;
use std::sync::OnceLock;

use jsonschema::{Draft, Validator};
use serde_json::Value;
use thiserror::Error;

/// Location reported when a violation sits on the document itself.
pub const ROOT_LOCATION: &str = "(root)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaName {
    /// Admission shape of a ruleset file.
    ControlRulesetV0,
    /// The only shape the kernel may emit.
    ControlVerdictV0,
}

impl SchemaName {
    pub const ALL: [SchemaName; 2] = [SchemaName::ControlRulesetV0, SchemaName::ControlVerdictV0];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ControlRulesetV0 => "control_ruleset_v0.schema.json",
            Self::ControlVerdictV0 => "control_verdict_v0.schema.json",
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Self::ControlRulesetV0 => include_str!("../schemas/control_ruleset_v0.schema.json"),
            Self::ControlVerdictV0 => include_str!("../schemas/control_verdict_v0.schema.json"),
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The instance broke one or more schema constraints.
    #[error("document does not satisfy {schema_name}:\n{violations}")]
    ValidationFailed {
        schema_name: SchemaName,
        violations: ValidationViolations,
    },

    /// An embedded schema failed to parse or compile. This is a packaging
    /// defect, never a property of the validated document.
    #[error("embedded schema {schema_name} is unusable: {reason}")]
    BrokenSchema { schema_name: SchemaName, reason: String },
}

impl SchemaValidationError {
    /// Headline location: the first violation's instance pointer,
    /// [`ROOT_LOCATION`] for document-level violations, or `(schema)` when
    /// the schema itself is at fault.
    pub fn location(&self) -> String {
        match self {
            Self::ValidationFailed { violations, .. } => match violations.first_path() {
                Some(p) if !p.is_empty() => p.to_string(),
                _ => ROOT_LOCATION.to_string(),
            },
            Self::BrokenSchema { .. } => "(schema)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer into the instance; empty for the document root.
    pub instance_path: String,
    /// JSON pointer to the schema keyword that failed.
    pub schema_path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_path.is_empty() {
            ROOT_LOCATION
        } else {
            &self.instance_path
        };
        write!(f, "  {at}: {} [{}]", self.message, self.schema_path)
    }
}

/// Violations in the order the validator reported them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationViolations(Vec<Violation>);

impl ValidationViolations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    pub fn first_path(&self) -> Option<&str> {
        self.0.first().map(|v| v.instance_path.as_str())
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Compiled validators for both contracts.
pub struct SchemaRegistry {
    ruleset: Validator,
    verdict: Validator,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &SchemaName::ALL)
            .finish_non_exhaustive()
    }
}

fn compile(schema_name: SchemaName) -> Result<Validator, SchemaValidationError> {
    let broken = |reason: String| SchemaValidationError::BrokenSchema { schema_name, reason };
    let schema: Value = serde_json::from_str(schema_name.text()).map_err(|e| broken(e.to_string()))?;
    let mut opts = jsonschema::options();
    opts.with_draft(Draft::Draft202012);
    opts.build(&schema).map_err(|e| broken(e.to_string()))
}

static EMBEDDED: OnceLock<SchemaRegistry> = OnceLock::new();

impl SchemaRegistry {
    /// Compile both contracts.
    ///
    /// # Errors
    ///
    /// [`SchemaValidationError::BrokenSchema`] if either embedded schema is
    /// not valid JSON or not a valid Draft 2020-12 schema.
    pub fn build() -> Result<Self, SchemaValidationError> {
        Ok(Self {
            ruleset: compile(SchemaName::ControlRulesetV0)?,
            verdict: compile(SchemaName::ControlVerdictV0)?,
        })
    }

    /// The process-wide registry, compiled on first use.
    pub fn embedded() -> Result<&'static SchemaRegistry, SchemaValidationError> {
        if let Some(registry) = EMBEDDED.get() {
            return Ok(registry);
        }
        let built = Self::build()?;
        Ok(EMBEDDED.get_or_init(|| built))
    }

    fn validator(&self, schema_name: SchemaName) -> &Validator {
        match schema_name {
            SchemaName::ControlRulesetV0 => &self.ruleset,
            SchemaName::ControlVerdictV0 => &self.verdict,
        }
    }

    /// Check `instance` against `schema_name`.
    ///
    /// # Errors
    ///
    /// [`SchemaValidationError::ValidationFailed`] carrying every violation.
    pub fn validate(&self, schema_name: SchemaName, instance: &Value) -> Result<(), SchemaValidationError> {
        let found: Vec<Violation> = self
            .validator(schema_name)
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        if found.is_empty() {
            return Ok(());
        }
        Err(SchemaValidationError::ValidationFailed {
            schema_name,
            violations: ValidationViolations(found),
        })
    }
}
