//! # Audit Anchors — Subject Reference and Time Window
//!
//! Both types are carried through the control plane as opaque anchors:
//! rule logic never branches on them. They are typed here so that the
//! verdict contract can insist on their closed shape.

use serde::{Deserialize, Serialize};

/// Reference to the spatial subject a verdict or problem state is about.
///
/// All four keys are optional; a well-formed reference names at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectRef {
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(rename = "groupId", default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(rename = "plotId", default, skip_serializing_if = "Option::is_none")]
    pub plot_id: Option<String>,
    #[serde(rename = "blockId", default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
}

impl SubjectRef {
    /// Subject reference naming a project and group, the common case.
    pub fn project_group(project_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            group_id: Some(group_id.into()),
            ..Self::default()
        }
    }

    /// True when no key is set.
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.group_id.is_none()
            && self.plot_id.is_none()
            && self.block_id.is_none()
    }
}

/// A closed time window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeWindow {
    #[serde(rename = "startTs")]
    pub start_ts: i64,
    #[serde(rename = "endTs")]
    pub end_ts: i64,
}

impl TimeWindow {
    pub fn new(start_ts: i64, end_ts: i64) -> Self {
        Self { start_ts, end_ts }
    }

    /// Length in milliseconds, clamped at zero for inverted windows.
    pub fn duration(&self) -> i64 {
        self.end_ts.saturating_sub(self.start_ts).max(0)
    }

    /// Non-negative bounds with `end_ts > start_ts`.
    pub fn is_well_formed(&self) -> bool {
        self.start_ts >= 0 && self.end_ts > self.start_ts
    }

    /// Inclusive containment: `self` fully covers `inner`.
    pub fn contains(&self, inner: &TimeWindow) -> bool {
        self.start_ts <= inner.start_ts && self.end_ts >= inner.end_ts
    }

    /// `|intersection| / min(duration_a, duration_b)`.
    ///
    /// Zero when either window has zero length or the windows are disjoint.
    pub fn overlap_ratio(&self, other: &TimeWindow) -> f64 {
        let a = self.duration();
        let b = other.duration();
        if a == 0 || b == 0 {
            return 0.0;
        }
        let inter_start = self.start_ts.max(other.start_ts);
        let inter_end = self.end_ts.min(other.end_ts);
        let inter = inter_end.saturating_sub(inter_start).max(0);
        inter as f64 / a.min(b) as f64
    }
}
