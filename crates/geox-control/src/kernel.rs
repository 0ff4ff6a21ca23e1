//! # Policy Evaluation Kernel
//!
//! Evaluates an [`AdmittedRuleSet`] against a [`FieldSnapshot`]. Pure: the
//! kernel reads nothing but the snapshot, and identity/time come in through
//! a [`VerdictStamp`].
//!
//! Rules are visited in list order.
//!
//! - `FIRST_MATCH`: the first rule whose predicate holds decides, whatever
//!   its verdict.
//! - `DENY_OVERRIDES`: a matching `DENY` decides; otherwise the first
//!   matching `ALLOW`; matching `UNDETERMINED` rules are ignored.
//!
//! With no decision the ruleset's default applies. v0 fixes it to
//! `UNDETERMINED`, and a defaulted verdict carries no `rule_ref`.
//!
//! Predicates never fail. A snapshot value of the wrong shape makes the
//! predicate false.

use serde_json::Value;

use geox_core::{SubjectRef, TimeWindow};

use crate::error::KernelError;
use crate::ruleset::{AdmittedRuleSet, CombineStrategy, RuleRef, Verdict};
use crate::snapshot::{
    FieldSnapshot, CANDIDATE_ACTION_CODES, PERMISSION_WINDOW_END, PERMISSION_WINDOW_START,
    PROBLEM_STATE_WINDOW_END, PROBLEM_STATE_WINDOW_START,
};
use crate::template::TemplateExpr;
use crate::verdict::{ControlVerdict, VerdictStamp, VerdictType, VERDICT_SCHEMA_VERSION};

/// Subject and window a verdict is about. Carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictAnchors {
    pub subject_ref: SubjectRef,
    pub window: TimeWindow,
}

/// Outcome of the combine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    /// `None` when the default verdict fired.
    pub rule_ref: Option<RuleRef>,
}

/// Kernel output before the harness stamps ruleset provenance onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelVerdict {
    pub stamp: VerdictStamp,
    pub anchors: VerdictAnchors,
    pub action_code: String,
    pub decision: Decision,
}

impl KernelVerdict {
    pub fn verdict(&self) -> Verdict {
        self.decision.verdict
    }

    /// Wire record with `rule_ref` in its anchor form. Provenance fields are
    /// left empty.
    pub fn into_control_verdict(self) -> ControlVerdict {
        ControlVerdict {
            doc_type: VerdictType::ControlVerdictV0,
            schema_version: VERDICT_SCHEMA_VERSION.to_string(),
            verdict_id: self.stamp.verdict_id,
            evaluated_at_ts: self.stamp.evaluated_at_ts,
            subject_ref: self.anchors.subject_ref,
            window: self.anchors.window,
            action_code: self.action_code,
            verdict: self.decision.verdict,
            rule_ref: self.decision.rule_ref.map(|r| r.to_anchor()),
            ruleset_ref: None,
            ruleset_status: None,
        }
    }
}

/// Evaluate one ruleset.
///
/// # Errors
///
/// [`KernelError::ActionNotPermitted`] when the ruleset's `action_code` is
/// not among the snapshot's candidate actions. No rule is matched in that
/// case.
pub fn evaluate(
    ruleset: &AdmittedRuleSet,
    snapshot: &FieldSnapshot,
    anchors: &VerdictAnchors,
    stamp: VerdictStamp,
) -> Result<KernelVerdict, KernelError> {
    check_permission(ruleset, snapshot)?;
    let decision = decide(ruleset, snapshot);
    tracing::debug!(
        ruleset_id = %ruleset.ruleset_id,
        verdict = %decision.verdict,
        defaulted = decision.rule_ref.is_none(),
        "ruleset evaluated"
    );
    Ok(KernelVerdict {
        stamp,
        anchors: anchors.clone(),
        action_code: ruleset.action_code.clone(),
        decision,
    })
}

/// Evaluate several rulesets independently against one snapshot. There is
/// no cross-ruleset aggregation; the first refusal aborts the batch.
pub fn evaluate_all(
    rulesets: &[AdmittedRuleSet],
    snapshot: &FieldSnapshot,
    anchors: &VerdictAnchors,
    mut next_stamp: impl FnMut() -> VerdictStamp,
) -> Result<Vec<KernelVerdict>, KernelError> {
    rulesets
        .iter()
        .map(|rs| evaluate(rs, snapshot, anchors, next_stamp()))
        .collect()
}

/// The ruleset's action must be a candidate in the permission set.
pub fn check_permission(ruleset: &AdmittedRuleSet, snapshot: &FieldSnapshot) -> Result<(), KernelError> {
    let permitted = snapshot
        .get(CANDIDATE_ACTION_CODES)
        .and_then(Value::as_array)
        .is_some_and(|codes| codes.iter().any(|c| c.as_str() == Some(ruleset.action_code.as_str())));
    if permitted {
        Ok(())
    } else {
        Err(KernelError::ActionNotPermitted {
            action_code: ruleset.action_code.clone(),
        })
    }
}

/// Apply the combine strategy.
pub fn decide(ruleset: &AdmittedRuleSet, snapshot: &FieldSnapshot) -> Decision {
    let mut matching = ruleset.rules.iter().filter(|r| matches(&r.expr, snapshot));

    let decided = match ruleset.combine_strategy {
        CombineStrategy::FirstMatch => matching.next(),
        CombineStrategy::DenyOverrides => {
            let mut first_allow = None;
            let mut deny = None;
            for rule in matching {
                match rule.verdict {
                    Verdict::Deny => {
                        deny = Some(rule);
                        break;
                    }
                    Verdict::Allow if first_allow.is_none() => first_allow = Some(rule),
                    _ => {}
                }
            }
            deny.or(first_allow)
        }
    };

    match decided {
        Some(rule) => Decision {
            verdict: rule.verdict,
            rule_ref: Some(ruleset.rule_ref(rule)),
        },
        None => Decision {
            verdict: ruleset.default_verdict(),
            rule_ref: None,
        },
    }
}

/// Whether `expr` holds over `snapshot`.
pub fn matches(expr: &TemplateExpr, snapshot: &FieldSnapshot) -> bool {
    match expr {
        TemplateExpr::FieldEq { path, value } => {
            snapshot.get(path).and_then(Value::as_str) == Some(value.as_str())
        }
        TemplateExpr::FieldIn { path, values } => snapshot
            .get(path)
            .and_then(Value::as_str)
            .is_some_and(|s| values.iter().any(|v| v == s)),
        TemplateExpr::FieldExists { path } => snapshot.get(path).is_some_and(|v| !v.is_null()),
        TemplateExpr::SetIntersects { path, values } => snapshot
            .get(path)
            .and_then(Value::as_array)
            .is_some_and(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| values.iter().any(|v| v == s))
            }),
        TemplateExpr::WindowMatch => window_match(snapshot),
        TemplateExpr::And { children } => children.iter().all(|c| matches(c, snapshot)),
        TemplateExpr::Or { children } => children.iter().any(|c| matches(c, snapshot)),
        TemplateExpr::Not { child } => !matches(child, snapshot),
    }
}

/// Structural check only: each window bound is absent or numeric, and
/// bounds present on both sides agree. A JSON `null` bound is never
/// stored by the projector, so it counts as absent and does not fail the
/// match.
fn window_match(snapshot: &FieldSnapshot) -> bool {
    let bound = |path: &str| -> Result<Option<f64>, ()> {
        match snapshot.get(path) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or(()),
        }
    };
    let (Ok(ps), Ok(pe), Ok(qs), Ok(qe)) = (
        bound(PROBLEM_STATE_WINDOW_START),
        bound(PROBLEM_STATE_WINDOW_END),
        bound(PERMISSION_WINDOW_START),
        bound(PERMISSION_WINDOW_END),
    ) else {
        return false;
    };
    let agree = |a: Option<f64>, b: Option<f64>| match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    };
    agree(ps, qs) && agree(pe, qe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::validate;
    use crate::constitution::Constitution;
    use serde_json::json;

    fn rule(id: &str, expr: Value, verdict: &str) -> Value {
        json!({
            "rule_id": id,
            "rule_version": "1.0.0",
            "template_id": expr["template_id"],
            "expr": expr,
            "verdict": verdict
        })
    }

    fn ruleset(strategy: &str, rules: Vec<Value>) -> AdmittedRuleSet {
        validate(
            &json!({
                "type": "control_ruleset_v0",
                "schema_version": "0.1.0",
                "ruleset_id": "rs_test",
                "action_code": "AO-SENSE",
                "combine_strategy": strategy,
                "default_verdict": "UNDETERMINED",
                "inputs_used": [
                    "problem_state.problem_type",
                    "problem_state.confidence",
                    "problem_state.uncertainty_sources[]"
                ],
                "allowed_template_ids": [
                    "FIELD_EQ", "FIELD_IN", "FIELD_EXISTS", "SET_INTERSECTS",
                    "WINDOW_MATCH", "LOGICAL_AND", "LOGICAL_OR_NOT"
                ],
                "rules": rules
            }),
            &Constitution::v0(),
        )
        .unwrap()
    }

    fn eq(value: &str) -> Value {
        json!({"template_id": "FIELD_EQ", "field_path": "problem_state.problem_type", "value": value})
    }

    fn snapshot(pairs: Vec<(&str, Value)>) -> FieldSnapshot {
        let mut all = vec![(CANDIDATE_ACTION_CODES, json!(["AO-SENSE"]))];
        all.extend(pairs);
        FieldSnapshot::from_pairs(&Constitution::v0(), all).unwrap()
    }

    fn anchors() -> VerdictAnchors {
        VerdictAnchors {
            subject_ref: SubjectRef::project_group("P0", "G0"),
            window: TimeWindow::new(1_700_000_000_000, 1_700_003_600_000),
        }
    }

    #[test]
    fn first_match_stops_at_first_true_rule() {
        let rs = ruleset(
            "FIRST_MATCH",
            vec![rule("a", eq("OTHER"), "DENY"), rule("b", eq("DEMO"), "ALLOW"), rule("c", eq("DEMO"), "DENY")],
        );
        let d = decide(&rs, &snapshot(vec![("problem_state.problem_type", json!("DEMO"))]));
        assert_eq!(d.verdict, Verdict::Allow);
        assert_eq!(d.rule_ref.unwrap().rule_id, "b");
    }

    #[test]
    fn first_match_honours_undetermined_rule() {
        let rs = ruleset(
            "FIRST_MATCH",
            vec![rule("u", eq("DEMO"), "UNDETERMINED"), rule("d", eq("DEMO"), "DENY")],
        );
        let d = decide(&rs, &snapshot(vec![("problem_state.problem_type", json!("DEMO"))]));
        assert_eq!(d.verdict, Verdict::Undetermined);
        assert_eq!(d.rule_ref.unwrap().rule_id, "u");
    }

    #[test]
    fn deny_overrides_earlier_allow() {
        let rs = ruleset(
            "DENY_OVERRIDES",
            vec![rule("allow", eq("DEMO"), "ALLOW"), rule("deny", eq("DEMO"), "DENY")],
        );
        let d = decide(&rs, &snapshot(vec![("problem_state.problem_type", json!("DEMO"))]));
        assert_eq!(d.verdict, Verdict::Deny);
        assert_eq!(d.rule_ref.unwrap().rule_id, "deny");
    }

    #[test]
    fn deny_overrides_falls_back_to_first_allow() {
        let rs = ruleset(
            "DENY_OVERRIDES",
            vec![
                rule("u", eq("DEMO"), "UNDETERMINED"),
                rule("allow1", eq("DEMO"), "ALLOW"),
                rule("allow2", eq("DEMO"), "ALLOW"),
                rule("deny", eq("OTHER"), "DENY"),
            ],
        );
        let d = decide(&rs, &snapshot(vec![("problem_state.problem_type", json!("DEMO"))]));
        assert_eq!(d.verdict, Verdict::Allow);
        assert_eq!(d.rule_ref.unwrap().rule_id, "allow1");
    }

    #[test]
    fn no_match_yields_default_without_rule_ref() {
        let rs = ruleset("DENY_OVERRIDES", vec![rule("deny", eq("DEMO"), "DENY")]);
        let d = decide(&rs, &snapshot(vec![]));
        assert_eq!(d, Decision { verdict: Verdict::Undetermined, rule_ref: None });
    }

    #[test]
    fn type_mismatch_is_false_not_error() {
        let s = snapshot(vec![
            ("problem_state.problem_type", json!(7)),
            ("problem_state.uncertainty_sources[]", json!("SENSOR_GAP")),
        ]);
        assert!(!matches(&TemplateExpr::from_value(&eq("7")).unwrap(), &s));
        let set = TemplateExpr::SetIntersects {
            path: "problem_state.uncertainty_sources[]".into(),
            values: vec!["SENSOR_GAP".into()],
        };
        assert!(!matches(&set, &s));
        let field_in = TemplateExpr::FieldIn {
            path: "problem_state.problem_type".into(),
            values: vec!["7".into()],
        };
        assert!(!matches(&field_in, &s));
    }

    #[test]
    fn set_intersects_and_exists() {
        let s = snapshot(vec![
            ("problem_state.uncertainty_sources[]", json!([1, "SENSOR_GAP"])),
            ("problem_state.confidence", json!("LOW")),
        ]);
        assert!(matches(
            &TemplateExpr::SetIntersects {
                path: "problem_state.uncertainty_sources[]".into(),
                values: vec!["MODEL_DRIFT".into(), "SENSOR_GAP".into()],
            },
            &s
        ));
        assert!(matches(&TemplateExpr::FieldExists { path: "problem_state.confidence".into() }, &s));
        assert!(!matches(&TemplateExpr::FieldExists { path: "problem_state.problem_type".into() }, &s));
    }

    #[test]
    fn logical_combinators() {
        let s = snapshot(vec![("problem_state.problem_type", json!("DEMO"))]);
        let t = TemplateExpr::from_value(&eq("DEMO")).unwrap();
        let f = TemplateExpr::from_value(&eq("OTHER")).unwrap();
        assert!(!matches(&TemplateExpr::And { children: vec![t.clone(), f.clone()] }, &s));
        assert!(matches(&TemplateExpr::Or { children: vec![f.clone(), t.clone()] }, &s));
        assert!(matches(&TemplateExpr::Not { child: Box::new(f) }, &s));
    }

    #[test]
    fn window_match_is_structural() {
        let same = snapshot(vec![
            (PROBLEM_STATE_WINDOW_START, json!(10)),
            (PROBLEM_STATE_WINDOW_END, json!(20)),
            (PERMISSION_WINDOW_START, json!(10.0)),
            (PERMISSION_WINDOW_END, json!(20)),
        ]);
        assert!(matches(&TemplateExpr::WindowMatch, &same));

        let one_sided = snapshot(vec![(PROBLEM_STATE_WINDOW_START, json!(10))]);
        assert!(matches(&TemplateExpr::WindowMatch, &one_sided));

        let differ = snapshot(vec![(PROBLEM_STATE_WINDOW_END, json!(20)), (PERMISSION_WINDOW_END, json!(21))]);
        assert!(!matches(&TemplateExpr::WindowMatch, &differ));

        let not_numeric = snapshot(vec![(PERMISSION_WINDOW_START, json!("10"))]);
        assert!(!matches(&TemplateExpr::WindowMatch, &not_numeric));
    }

    #[test]
    fn null_window_bound_is_treated_as_absent() {
        let problem_state = json!({"window": {"startTs": 10, "endTs": 20}});
        let permission_set = json!({
            "window": {"startTs": null, "endTs": 20},
            "candidate_actions": [{"action_code": "AO-SENSE"}]
        });
        let s = crate::snapshot::project(
            &Constitution::v0(),
            crate::snapshot::ProjectionInputs {
                problem_state: &problem_state,
                uncertainty_envelope: &Value::Null,
                permission_set: &permission_set,
            },
        );
        assert!(!s.contains(PERMISSION_WINDOW_START));
        assert!(matches(&TemplateExpr::WindowMatch, &s));
    }

    #[test]
    fn action_outside_permission_set_is_refused() {
        let rs = ruleset("FIRST_MATCH", vec![rule("a", eq("DEMO"), "ALLOW")]);
        let s = FieldSnapshot::from_pairs(
            &Constitution::v0(),
            [(CANDIDATE_ACTION_CODES, json!(["AO-APPLY"]))],
        )
        .unwrap();
        let err = evaluate(&rs, &s, &anchors(), VerdictStamp::fixed("v", 0)).unwrap_err();
        assert_eq!(err.code(), "ACTION_CODE_NOT_IN_PERMISSION_SET");
    }

    #[test]
    fn evaluate_carries_anchors_and_anchored_rule_ref() {
        let rs = ruleset("FIRST_MATCH", vec![rule("deny_demo", eq("DEMO"), "DENY")]);
        let s = snapshot(vec![("problem_state.problem_type", json!("DEMO"))]);
        let kv = evaluate(&rs, &s, &anchors(), VerdictStamp::fixed("verdict_1", 42)).unwrap();
        assert_eq!(kv.verdict(), Verdict::Deny);
        let cv = kv.into_control_verdict();
        assert_eq!(cv.rule_ref.as_deref(), Some("repo-const-v0:rs_test/deny_demo@1.0.0"));
        assert_eq!(cv.subject_ref, SubjectRef::project_group("P0", "G0"));
        assert!(cv.revalidate().is_ok());
    }

    #[test]
    fn evaluate_all_is_one_verdict_per_ruleset() {
        let deny = ruleset("FIRST_MATCH", vec![rule("d", eq("DEMO"), "DENY")]);
        let allow = ruleset("FIRST_MATCH", vec![rule("a", eq("DEMO"), "ALLOW")]);
        let s = snapshot(vec![("problem_state.problem_type", json!("DEMO"))]);
        let mut n = 0;
        let out = evaluate_all(&[deny, allow], &s, &anchors(), || {
            n += 1;
            VerdictStamp::fixed(format!("verdict_{n}"), n)
        })
        .unwrap();
        let verdicts: Vec<_> = out.iter().map(KernelVerdict::verdict).collect();
        assert_eq!(verdicts, vec![Verdict::Deny, Verdict::Allow]);
        assert_eq!(out[1].stamp.verdict_id, "verdict_2");
    }
}
