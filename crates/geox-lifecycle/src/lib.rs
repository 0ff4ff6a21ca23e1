//! # geox-lifecycle — ProblemState Governance Index
//!
//! Computes which time-windowed problem statements are `ACTIVE`,
//! `SUPERSEDED`, `EXPIRED` or administratively `FROZEN` as of a caller
//! supplied instant.
//!
//! ## Crate Policy
//!
//! - Pure: no I/O and no clock. The same input always yields the same rows.
//! - Input order never matters; groups and rows are ordered explicitly.
//! - A frozen state never enters the supersession graph.

pub mod constants;
pub mod error;
pub mod index;

pub use constants::LifecycleConstants;
pub use error::LifecycleError;
pub use index::{compute_index, compute_index_with, ComputeIndexInput, IndexRow, LifecycleState, ProblemStateV1Like};
