//! # RuleSet Types
//!
//! Typed form of a `control_ruleset_v0` document. Deserialization is
//! strict (`deny_unknown_fields` at every level, constant fields modeled
//! as single-variant enums) but it is not admission: the constitution and
//! closure gates live in [`crate::admission`]. The only way to obtain an
//! [`AdmittedRuleSet`], which is what the kernel accepts, is to pass those
//! gates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::template::{TemplateExpr, TemplateId};

/// The three-valued decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,
    Deny,
    Undetermined,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
            Self::Undetermined => "UNDETERMINED",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombineStrategy {
    /// Any matching DENY wins, then any matching ALLOW.
    DenyOverrides,
    /// The first matching rule decides.
    FirstMatch,
}

/// Document type tag. Only one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSetType {
    #[serde(rename = "control_ruleset_v0")]
    ControlRulesetV0,
}

/// The only default verdict v0 admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultVerdict {
    #[serde(rename = "UNDETERMINED")]
    Undetermined,
}

impl From<DefaultVerdict> for Verdict {
    fn from(d: DefaultVerdict) -> Self {
        match d {
            DefaultVerdict::Undetermined => Verdict::Undetermined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub rule_id: String,
    pub rule_version: String,
    pub template_id: TemplateId,
    pub expr: TemplateExpr,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(rename = "type")]
    pub doc_type: RuleSetType,
    pub schema_version: String,
    pub ruleset_id: String,
    pub action_code: String,
    pub combine_strategy: CombineStrategy,
    pub default_verdict: DefaultVerdict,
    pub inputs_used: Vec<String>,
    pub allowed_template_ids: Vec<TemplateId>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn default_verdict(&self) -> Verdict {
        self.default_verdict.into()
    }

    /// `inputs_used` as a set; duplicates in the document are harmless.
    pub fn declared_inputs(&self) -> BTreeSet<&str> {
        self.inputs_used.iter().map(String::as_str).collect()
    }

    pub fn rule_ref(&self, rule: &Rule) -> RuleRef {
        RuleRef {
            ruleset_id: self.ruleset_id.clone(),
            rule_id: rule.rule_id.clone(),
            rule_version: rule.rule_version.clone(),
        }
    }
}

/// A ruleset that passed every admission gate.
///
/// Constructed only by [`crate::admission`]; the inner value is read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdmittedRuleSet(RuleSet);

impl AdmittedRuleSet {
    pub(crate) fn new_unchecked(ruleset: RuleSet) -> Self {
        Self(ruleset)
    }

    pub fn ruleset(&self) -> &RuleSet {
        &self.0
    }

    pub fn into_inner(self) -> RuleSet {
        self.0
    }
}

impl std::ops::Deref for AdmittedRuleSet {
    type Target = RuleSet;

    fn deref(&self) -> &RuleSet {
        &self.0
    }
}

/// Which rule produced a verdict: `ruleset_id/rule_id@rule_version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleRef {
    pub ruleset_id: String,
    pub rule_id: String,
    pub rule_version: String,
}

impl RuleRef {
    pub const NAMESPACE: &'static str = "repo-const-v0";
    pub const UNPARSEABLE: &'static str = "repo-const-v0:UNPARSEABLE_RULE_REF";

    /// Audit anchor string. Falls back to [`Self::UNPARSEABLE`] when any
    /// component is empty.
    pub fn to_anchor(&self) -> String {
        if self.ruleset_id.is_empty() || self.rule_id.is_empty() || self.rule_version.is_empty() {
            return Self::UNPARSEABLE.to_string();
        }
        format!("{}:{self}", Self::NAMESPACE)
    }
}

impl std::fmt::Display for RuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.ruleset_id, self.rule_id, self.rule_version)
    }
}
