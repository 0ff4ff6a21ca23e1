//! # ProblemState Governance Index
//!
//! Derives a lifecycle state for each problem state in a batch:
//!
//! 1. Group by governance key: canonical `subjectRef`, `scale`,
//!    `problem_type`, `input_digest` (absent digest is the empty string).
//! 2. Order each group by `(created_at_ts, problem_state_id)`.
//! 3. Each non-frozen state is superseded by the first later non-frozen
//!    state whose window contains it (inclusive), or whose overlap ratio
//!    with it reaches `MERGE_OVERLAP_RATIO`.
//! 4. `FROZEN` beats everything and clears `superseded_by`; then
//!    `SUPERSEDED`; then `EXPIRED` when `asOfTs > endTs + EXPIRE_AFTER_MS`;
//!    otherwise `ACTIVE`.
//!
//! Rows come back sorted by `problem_state_id`. The clock is never read;
//! "now" is `asOfTs`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use geox_core::{canonical_string, TimeWindow};

use crate::constants::LifecycleConstants;
use crate::error::LifecycleError;

/// The fields of a ProblemState the index reads. Other fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemStateV1Like {
    pub problem_state_id: String,
    pub created_at_ts: i64,
    /// Opaque; only its canonical form matters.
    #[serde(rename = "subjectRef")]
    pub subject_ref: Value,
    pub scale: String,
    pub window: TimeWindow,
    pub problem_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Active,
    Superseded,
    Expired,
    Frozen,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Active => "ACTIVE",
            Self::Superseded => "SUPERSEDED",
            Self::Expired => "EXPIRED",
            Self::Frozen => "FROZEN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    pub problem_state_id: String,
    pub lifecycle_state: LifecycleState,
    pub superseded_by: Option<String>,
}

/// Batch input, in the shape fixtures are written in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeIndexInput {
    #[serde(default)]
    pub problem_states: Vec<ProblemStateV1Like>,
    #[serde(rename = "asOfTs")]
    pub as_of_ts: i64,
    #[serde(default)]
    pub constants: Map<String, Value>,
    #[serde(default)]
    pub frozen_ids: Vec<String>,
}

/// Governance grouping key. Kept as a tuple so no separator character can
/// make two different keys collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    subject: String,
    scale: String,
    problem_type: String,
    input_digest: String,
}

impl GroupKey {
    fn of(ps: &ProblemStateV1Like) -> Result<Self, LifecycleError> {
        let subject = canonical_string(&ps.subject_ref)
            .map_err(|e| LifecycleError::group_key(&ps.problem_state_id, e))?;
        Ok(Self {
            subject,
            scale: ps.scale.clone(),
            problem_type: ps.problem_type.clone(),
            input_digest: ps.input_digest.clone().unwrap_or_default(),
        })
    }
}

/// Resolve constants from the input object, then compute the index.
pub fn compute_index(input: &ComputeIndexInput) -> Result<Vec<IndexRow>, LifecycleError> {
    let constants = LifecycleConstants::from_map(&input.constants)?;
    let frozen: BTreeSet<&str> = input.frozen_ids.iter().map(String::as_str).collect();
    compute_index_with(&input.problem_states, input.as_of_ts, &constants, &frozen)
}

/// Compute the index with already resolved constants.
pub fn compute_index_with(
    problem_states: &[ProblemStateV1Like],
    as_of_ts: i64,
    constants: &LifecycleConstants,
    frozen: &BTreeSet<&str>,
) -> Result<Vec<IndexRow>, LifecycleError> {
    let mut groups: BTreeMap<GroupKey, Vec<&ProblemStateV1Like>> = BTreeMap::new();
    for ps in problem_states {
        groups.entry(GroupKey::of(ps)?).or_default().push(ps);
    }
    tracing::debug!(
        states = problem_states.len(),
        groups = groups.len(),
        frozen = frozen.len(),
        as_of_ts,
        "computing problem state index"
    );

    let mut rows = Vec::with_capacity(problem_states.len());
    for members in groups.values_mut() {
        members.sort_by(|a, b| {
            a.created_at_ts
                .cmp(&b.created_at_ts)
                .then_with(|| a.problem_state_id.cmp(&b.problem_state_id))
        });
        let edges = supersession(members, constants, frozen);

        for (i, ps) in members.iter().enumerate() {
            let (lifecycle_state, superseded_by) = if frozen.contains(ps.problem_state_id.as_str()) {
                (LifecycleState::Frozen, None)
            } else if let Some(j) = edges[i] {
                (LifecycleState::Superseded, Some(members[j].problem_state_id.clone()))
            } else if is_expired(as_of_ts, &ps.window, constants.expire_after_ms) {
                (LifecycleState::Expired, None)
            } else {
                (LifecycleState::Active, None)
            };
            rows.push(IndexRow {
                problem_state_id: ps.problem_state_id.clone(),
                lifecycle_state,
                superseded_by,
            });
        }
    }

    rows.sort_by(|a, b| a.problem_state_id.cmp(&b.problem_state_id));
    Ok(rows)
}

/// For each member (in sorted order), the index of its supersessor.
fn supersession(
    members: &[&ProblemStateV1Like],
    constants: &LifecycleConstants,
    frozen: &BTreeSet<&str>,
) -> Vec<Option<usize>> {
    let is_frozen = |ps: &ProblemStateV1Like| frozen.contains(ps.problem_state_id.as_str());
    members
        .iter()
        .enumerate()
        .map(|(i, older)| {
            if is_frozen(older) {
                return None;
            }
            members
                .iter()
                .enumerate()
                .skip(i + 1)
                .filter(|(_, newer)| !is_frozen(newer))
                .find(|(_, newer)| supersedes(&newer.window, &older.window, constants.merge_overlap_ratio))
                .map(|(j, _)| j)
        })
        .collect()
}

/// Containment first, then the overlap threshold.
fn supersedes(newer: &TimeWindow, older: &TimeWindow, merge_overlap_ratio: f64) -> bool {
    newer.contains(older) || older.overlap_ratio(newer) >= merge_overlap_ratio
}

/// Strict: exactly at the boundary is still live.
fn is_expired(as_of_ts: i64, window: &TimeWindow, expire_after_ms: f64) -> bool {
    as_of_ts as f64 > window.end_ts as f64 + expire_after_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ps(id: &str, created: i64, start: i64, end: i64) -> ProblemStateV1Like {
        ProblemStateV1Like {
            problem_state_id: id.into(),
            created_at_ts: created,
            subject_ref: json!({"projectId": "P0", "groupId": "G0"}),
            scale: "GROUP".into(),
            window: TimeWindow::new(start, end),
            problem_type: "PEST".into(),
            input_digest: None,
        }
    }

    fn constants(ratio: f64, expire: f64) -> LifecycleConstants {
        LifecycleConstants::new(ratio, expire).unwrap()
    }

    fn run(states: &[ProblemStateV1Like], as_of: i64, frozen: &[&str]) -> Vec<IndexRow> {
        let frozen: BTreeSet<&str> = frozen.iter().copied().collect();
        compute_index_with(states, as_of, &constants(0.8, 1000.0), &frozen).unwrap()
    }

    fn state_of<'a>(rows: &'a [IndexRow], id: &str) -> &'a IndexRow {
        rows.iter().find(|r| r.problem_state_id == id).unwrap()
    }

    #[test]
    fn full_overlap_supersedes_older() {
        let rows = run(&[ps("a", 1, 0, 100), ps("b", 2, 10, 90)], 0, &[]);
        // b does not contain a, but their overlap is 80/80.
        assert_eq!(state_of(&rows, "a").lifecycle_state, LifecycleState::Superseded);
        assert_eq!(state_of(&rows, "a").superseded_by.as_deref(), Some("b"));
        assert_eq!(state_of(&rows, "b").lifecycle_state, LifecycleState::Active);
    }

    #[test]
    fn containment_supersedes_below_threshold() {
        let c = constants(2.0, 0.0);
        let rows = compute_index_with(&[ps("old", 1, 40, 60), ps("new", 2, 0, 100)], 0, &c, &BTreeSet::new())
            .unwrap();
        assert_eq!(state_of(&rows, "old").superseded_by.as_deref(), Some("new"));
    }

    #[test]
    fn low_overlap_does_not_supersede() {
        let rows = run(&[ps("a", 1, 0, 100), ps("b", 2, 50, 150)], 0, &[]);
        assert_eq!(state_of(&rows, "a").lifecycle_state, LifecycleState::Active);
        assert_eq!(state_of(&rows, "b").lifecycle_state, LifecycleState::Active);
    }

    #[test]
    fn first_qualifying_successor_wins() {
        let rows = run(&[ps("a", 1, 0, 100), ps("b", 2, 0, 100), ps("c", 3, 0, 100)], 0, &[]);
        assert_eq!(state_of(&rows, "a").superseded_by.as_deref(), Some("b"));
        assert_eq!(state_of(&rows, "b").superseded_by.as_deref(), Some("c"));
        assert_eq!(state_of(&rows, "c").lifecycle_state, LifecycleState::Active);
    }

    #[test]
    fn frozen_state_neither_supersedes_nor_is_superseded() {
        let rows = run(&[ps("a", 1, 0, 100), ps("f", 2, 0, 100), ps("c", 3, 0, 100)], 0, &["f"]);
        assert_eq!(state_of(&rows, "f").lifecycle_state, LifecycleState::Frozen);
        assert_eq!(state_of(&rows, "f").superseded_by, None);
        assert_eq!(state_of(&rows, "a").superseded_by.as_deref(), Some("c"));
    }

    #[test]
    fn different_keys_never_interact() {
        let mut other = ps("b", 2, 0, 100);
        other.problem_type = "DISEASE".into();
        let rows = run(&[ps("a", 1, 0, 100), other], 0, &[]);
        assert!(rows.iter().all(|r| r.lifecycle_state == LifecycleState::Active));
    }

    #[test]
    fn absent_digest_groups_with_empty_digest() {
        let mut b = ps("b", 2, 0, 100);
        b.input_digest = Some(String::new());
        let rows = run(&[ps("a", 1, 0, 100), b], 0, &[]);
        assert_eq!(state_of(&rows, "a").superseded_by.as_deref(), Some("b"));
    }

    #[test]
    fn subject_key_order_does_not_split_groups() {
        let mut b = ps("b", 2, 0, 100);
        b.subject_ref = json!({"groupId": "G0", "projectId": "P0"});
        let rows = run(&[ps("a", 1, 0, 100), b], 0, &[]);
        assert_eq!(state_of(&rows, "a").lifecycle_state, LifecycleState::Superseded);
    }

    #[test]
    fn creation_ties_break_on_id() {
        let rows = run(&[ps("z", 5, 0, 100), ps("m", 5, 0, 100)], 0, &[]);
        assert_eq!(state_of(&rows, "m").superseded_by.as_deref(), Some("z"));
    }

    #[test]
    fn zero_length_window_only_superseded_by_containment() {
        let rows = run(&[ps("point", 1, 50, 50), ps("span", 2, 0, 100)], 0, &[]);
        assert_eq!(state_of(&rows, "point").superseded_by.as_deref(), Some("span"));

        let rows = run(&[ps("point", 1, 500, 500), ps("span", 2, 0, 100)], 0, &[]);
        assert_eq!(state_of(&rows, "point").superseded_by, None);
    }

    #[test]
    fn expiry_is_strict() {
        assert_eq!(run(&[ps("a", 1, 0, 100)], 1100, &[])[0].lifecycle_state, LifecycleState::Active);
        assert_eq!(run(&[ps("a", 1, 0, 100)], 1101, &[])[0].lifecycle_state, LifecycleState::Expired);
    }

    #[test]
    fn superseded_outranks_expired_and_frozen_outranks_both() {
        let rows = run(&[ps("a", 1, 0, 100), ps("b", 2, 0, 100)], 10_000, &[]);
        assert_eq!(state_of(&rows, "a").lifecycle_state, LifecycleState::Superseded);
        assert_eq!(state_of(&rows, "b").lifecycle_state, LifecycleState::Expired);

        let rows = run(&[ps("a", 1, 0, 100)], 10_000, &["a"]);
        assert_eq!(rows[0].lifecycle_state, LifecycleState::Frozen);
    }

    #[test]
    fn rows_sorted_by_id() {
        let rows = run(&[ps("c", 1, 0, 10), ps("a", 2, 20, 30), ps("b", 3, 40, 50)], 0, &[]);
        let ids: Vec<_> = rows.iter().map(|r| r.problem_state_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn deserializes_fixture_shape() {
        let input: ComputeIndexInput = serde_json::from_value(json!({
            "problem_states": [{
                "problem_state_id": "ps_1",
                "created_at_ts": 1,
                "subjectRef": {"projectId": "P0"},
                "scale": "GROUP",
                "window": {"startTs": 0, "endTs": 100},
                "problem_type": "PEST",
                "confidence": "LOW"
            }],
            "asOfTs": 50,
            "constants": {"mergeOverlapRatio": 0.5, "expiryBufferMs": 0}
        }))
        .unwrap();
        let rows = compute_index(&input).unwrap();
        assert_eq!(
            serde_json::to_value(&rows).unwrap(),
            json!([{"problem_state_id": "ps_1", "lifecycle_state": "ACTIVE", "superseded_by": null}])
        );
    }

    #[test]
    fn missing_constants_fail_the_call() {
        let input = ComputeIndexInput {
            problem_states: vec![],
            as_of_ts: 0,
            constants: Map::new(),
            frozen_ids: vec![],
        };
        assert!(matches!(compute_index(&input), Err(LifecycleError::InvalidConstant { .. })));
    }
}
