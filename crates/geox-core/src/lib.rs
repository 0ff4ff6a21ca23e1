//! # geox-core — Foundational Types for the GEOX Control Plane
//!
//! Leaf crate of the workspace. It holds the small set of primitives that
//! both the policy kernel and the governance lifecycle engine lean on.
//!
//! ## Key Design Principles
//!
//! 1. **One canonical JSON path.** Grouping keys and any other identity
//!    derived from JSON flow through [`CanonicalBytes::new()`], which emits
//!    RFC 8785 key-sorted output. Nothing depends on map iteration order.
//!
//! 2. **Content digests are self-describing.** [`ContentDigest`] renders as
//!    `sha256:<hex>` so a ref can be recomputed offline from the same bytes.
//!
//! 3. **Anchors are opaque.** [`SubjectRef`] and [`TimeWindow`] are carried
//!    through verdicts and problem states without interpretation. Window
//!    arithmetic (containment, overlap ratio) lives here so the lifecycle
//!    engine does not reimplement it.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `geox-*` crates.
//! - No I/O, no `unsafe`, no `.unwrap()` outside tests.

pub mod anchor;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod temporal;

pub use anchor::{SubjectRef, TimeWindow};
pub use canonical::{canonical_string, CanonicalBytes};
pub use digest::{sha256_bytes, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, GeoxError};
pub use temporal::epoch_millis_now;
