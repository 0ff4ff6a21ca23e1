//! # geox-harness — RuleSet Loader and Evaluation Harness
//!
//! The only library crate that touches the filesystem, and only to read
//! one ruleset file from a path the caller names.
//!
//! ## Crate Policy
//!
//! - No directory scanning or discovery; one explicit path per call.
//! - `MISSING` and `INVALID` are outcomes, not errors. Both map to
//!   `UNDETERMINED` verdicts and never escape as `Err`.
//! - Kernel refusals and verdict contract violations do escape as `Err`;
//!   they are never coerced into a verdict.

pub mod error;
pub mod harness;
pub mod loader;

pub use error::HarnessError;
pub use harness::{evaluate, evaluate_loaded, evaluate_with_stamp, is_ruleset_file, EvaluateInput, EvaluateResult};
pub use loader::{load_ruleset, load_ruleset_bytes, ruleset_ref_from_bytes, LoadSummary, RulesetLoadResult};
