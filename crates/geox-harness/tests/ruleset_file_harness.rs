//! # Ruleset File Harness Scenarios
//!
//! Drives the harness through the checked-in fixtures and through
//! temporary copies of them.

use std::fs;
use std::path::PathBuf;

use geox_control::{Constitution, RulesetStatus, Verdict, VerdictStamp};
use geox_harness::{
    evaluate, evaluate_with_stamp, is_ruleset_file, load_ruleset, ruleset_ref_from_bytes, EvaluateInput,
    HarnessError,
};
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/rulesets_v0")
        .join(name)
}

fn input() -> EvaluateInput {
    serde_json::from_value(json!({
        "subjectRef": {"projectId": "P0", "groupId": "G0"},
        "window": {"startTs": 1700000000000_i64, "endTs": 1700003600000_i64},
        "action_code": "AO-SENSE",
        "problemState": {
            "subjectRef": {"projectId": "P0", "groupId": "G0"},
            "window": {"startTs": 1700000000000_i64, "endTs": 1700003600000_i64},
            "problem_type": "DEMO"
        },
        "uncertaintyEnvelope": {},
        "permissionSet": {"candidate_actions": [{"action_code": "AO-SENSE"}]}
    }))
    .unwrap()
}

fn stamp() -> VerdictStamp {
    VerdictStamp::fixed("verdict_fixture", 1_700_000_000_500)
}

#[test]
fn applied_ruleset_denies_demo_problem() {
    let out = evaluate(&fixture("ruleset_ok_001.json"), &input(), &Constitution::v0()).unwrap();
    assert_eq!(out.ruleset_status, RulesetStatus::Applied);
    assert_eq!(out.verdict.ruleset_status, Some(RulesetStatus::Applied));
    assert_eq!(out.verdict.verdict, Verdict::Deny);
    assert_eq!(
        out.verdict.rule_ref.as_deref(),
        Some("repo-const-v0:ruleset_ok_001/deny_demo_problem@1.0.0")
    );

    let bytes = fs::read(fixture("ruleset_ok_001.json")).unwrap();
    let ruleset_ref = out.verdict.ruleset_ref.unwrap();
    assert!(ruleset_ref.starts_with("sha256:"));
    assert_eq!(ruleset_ref, ruleset_ref_from_bytes(&bytes));
}

#[test]
fn missing_file_is_undetermined() {
    let out = evaluate(&fixture("DOES_NOT_EXIST.json"), &input(), &Constitution::v0()).unwrap();
    assert_eq!(out.verdict.verdict, Verdict::Undetermined);
    assert_eq!(out.ruleset_status, RulesetStatus::Missing);
    assert_eq!(out.verdict.ruleset_ref.as_deref(), Some("MISSING"));
    assert_eq!(out.verdict.rule_ref, None);
    assert_eq!(out.verdict.action_code, "AO-SENSE");
}

#[test]
fn inadmissible_file_is_undetermined_with_byte_ref() {
    let path = fixture("ruleset_invalid_001.json");
    let out = evaluate(&path, &input(), &Constitution::v0()).unwrap();
    assert_eq!(out.verdict.verdict, Verdict::Undetermined);
    assert_eq!(out.ruleset_status, RulesetStatus::Invalid);
    assert_eq!(
        out.verdict.ruleset_ref.unwrap(),
        ruleset_ref_from_bytes(&fs::read(&path).unwrap())
    );

    let loaded = load_ruleset(&path, &Constitution::v0()).unwrap();
    assert_eq!(loaded.error_code(), Some("INPUT_PATH_NOT_DECLARED_IN_INPUTS_USED"));
}

#[test]
fn same_bytes_same_input_same_verdict() {
    let path = fixture("ruleset_ok_001.json");
    let a = evaluate_with_stamp(&path, &input(), &Constitution::v0(), stamp()).unwrap();
    let b = evaluate_with_stamp(&path, &input(), &Constitution::v0(), stamp()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn one_byte_mutation_changes_ref() {
    let dir = tempfile::tempdir().unwrap();
    let original = fs::read(fixture("ruleset_ok_001.json")).unwrap();

    let first = dir.path().join("a.json");
    fs::write(&first, &original).unwrap();
    let again = load_ruleset(&first, &Constitution::v0()).unwrap();
    let twice = load_ruleset(&first, &Constitution::v0()).unwrap();
    assert_eq!(again.ruleset_ref(), twice.ruleset_ref());

    // Trailing whitespace keeps the document admissible but changes the bytes.
    let mut mutated = original.clone();
    mutated.push(b'\n');
    let second = dir.path().join("b.json");
    fs::write(&second, &mutated).unwrap();
    let other = load_ruleset(&second, &Constitution::v0()).unwrap();
    assert_eq!(other.status(), RulesetStatus::Applied);
    assert_ne!(again.ruleset_ref(), other.ruleset_ref());
}

#[test]
fn other_rulesets_follow_input_facts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("first_match.json");
    fs::write(
        &path,
        serde_json::to_vec_pretty(&json!({
            "type": "control_ruleset_v0",
            "schema_version": "0.1.0",
            "ruleset_id": "rs_sources",
            "action_code": "AO-SENSE",
            "combine_strategy": "FIRST_MATCH",
            "default_verdict": "UNDETERMINED",
            "inputs_used": ["problem_state.uncertainty_sources[]"],
            "allowed_template_ids": ["SET_INTERSECTS"],
            "rules": [{
                "rule_id": "allow_gap",
                "rule_version": "2.1.0",
                "template_id": "SET_INTERSECTS",
                "expr": {"template_id": "SET_INTERSECTS", "field_path": "problem_state.uncertainty_sources[]", "values": ["SENSOR_GAP"]},
                "verdict": "ALLOW"
            }]
        }))
        .unwrap(),
    )
    .unwrap();

    let mut inp = input();
    let defaulted = evaluate_with_stamp(&path, &inp, &Constitution::v0(), stamp()).unwrap();
    assert_eq!(defaulted.verdict.verdict, Verdict::Undetermined);
    assert_eq!(defaulted.verdict.rule_ref, None);
    assert_eq!(defaulted.ruleset_status, RulesetStatus::Applied);

    inp.problem_state["uncertainty_sources"] = json!(["SENSOR_GAP"]);
    let allowed = evaluate_with_stamp(&path, &inp, &Constitution::v0(), stamp()).unwrap();
    assert_eq!(allowed.verdict.verdict, Verdict::Allow);
    assert_eq!(
        allowed.verdict.rule_ref.as_deref(),
        Some("repo-const-v0:rs_sources/allow_gap@2.1.0")
    );
}

#[test]
fn action_outside_permission_set_is_an_error() {
    let mut inp = input();
    inp.permission_set = json!({"candidate_actions": [{"action_code": "AO-APPLY"}]});
    let err = evaluate(&fixture("ruleset_ok_001.json"), &inp, &Constitution::v0()).unwrap_err();
    assert!(matches!(err, HarnessError::Kernel(_)));
}

#[test]
fn inverted_window_breaks_the_verdict_contract() {
    let mut inp = input();
    inp.window = geox_core::TimeWindow::new(10, 5);
    let err = evaluate(&fixture("DOES_NOT_EXIST.json"), &inp, &Constitution::v0()).unwrap_err();
    assert!(matches!(err, HarnessError::Contract(_)));
}

#[test]
fn is_ruleset_file_reports_admissibility() {
    let c = Constitution::v0();
    assert!(is_ruleset_file(&fixture("ruleset_ok_001.json"), &c));
    assert!(!is_ruleset_file(&fixture("ruleset_invalid_001.json"), &c));
    assert!(!is_ruleset_file(&fixture("DOES_NOT_EXIST.json"), &c));
}
