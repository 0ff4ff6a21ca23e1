//! # geox-schema — Embedded Contract Schemas
//!
//! JSON Schemas for the two frozen control-plane contracts and the
//! validator that enforces them:
//!
//! - `control_ruleset_v0`: the structural admission gate for rulesets.
//! - `control_verdict_v0`: the closed output shape of the kernel, used
//!   to re-validate every verdict before it leaves the harness.
//!
//! ## Crate Policy
//!
//! - Every object in every schema sets `additionalProperties: false`.
//! - Schemas are compiled into the binary; there is no runtime schema
//!   discovery.

pub mod validate;

pub use validate::{
    SchemaName, SchemaRegistry, SchemaValidationError, ValidationViolations, Violation, ROOT_LOCATION,
};
