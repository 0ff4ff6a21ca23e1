//! # geox-control — Deterministic Policy Engine
//!
//! Turns a closed-form ruleset plus a snapshot of derived facts into an
//! auditable `ALLOW` / `DENY` / `UNDETERMINED` verdict.
//!
//! ## Architecture
//!
//! - **Template** (`template.rs`): the closed expression grammar, eight
//!   shapes under seven template ids.
//!
//! - **RuleSet** (`ruleset.rs`): typed `control_ruleset_v0` and the
//!   [`AdmittedRuleSet`] wrapper that only admission can construct.
//!
//! - **Constitution** (`constitution.rs`): the action taxonomy and the
//!   allowed input paths, injected as data.
//!
//! - **Admission** (`admission.rs`): five sequential gates, first failure
//!   wins.
//!
//! - **Snapshot** (`snapshot.rs`): projection of problem state, uncertainty
//!   envelope and permission set onto allowed input paths.
//!
//! - **Kernel** (`kernel.rs`): combine strategies and the template matcher.
//!
//! - **Verdict** (`verdict.rs`): the closed `control_verdict_v0` record and
//!   its strict parser.
//!
//! ## Crate Policy
//!
//! - No file or network I/O. The only clock read is [`VerdictStamp::now`].
//! - The kernel accepts only [`AdmittedRuleSet`]; an unadmitted ruleset
//!   cannot be evaluated.
//! - An unclassified situation yields `UNDETERMINED`, never a silent
//!   `ALLOW` or `DENY`.

pub mod admission;
pub mod constitution;
pub mod error;
pub mod kernel;
pub mod ruleset;
pub mod snapshot;
pub mod template;
pub mod verdict;

pub use admission::{is_control_ruleset, validate, validate_bytes};
pub use constitution::Constitution;
pub use error::{AdmissionError, ConstitutionError, ErrorKind, KernelError, VerdictContractError};
pub use kernel::{decide, evaluate, evaluate_all, Decision, KernelVerdict, VerdictAnchors};
pub use ruleset::{AdmittedRuleSet, CombineStrategy, Rule, RuleRef, RuleSet, Verdict};
pub use snapshot::{project, FieldSnapshot, ProjectionInputs};
pub use template::{TemplateExpr, TemplateId};
pub use verdict::{
    parse_control_verdict, ControlVerdict, RulesetStatus, VerdictStamp, MISSING_RULESET_REF,
    VERDICT_SCHEMA_VERSION,
};
