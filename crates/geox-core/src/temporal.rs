//! # Temporal Helpers
//!
//! Timestamps in the control plane are epoch milliseconds (`i64`), the
//! unit used by facts and windows. The clock is read in exactly one place
//! so pure code paths can be audited for wall-clock access with a grep.

use chrono::Utc;

/// Current UTC time as epoch milliseconds.
///
/// Only verdict stamping calls this. The lifecycle engine never does; its
/// "now" is always the caller-supplied `asOfTs`.
pub fn epoch_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}
