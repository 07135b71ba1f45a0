use judgebox::verdict;
use judgebox::{CaseOutcome, ExecutionOutcome, Verdict, VerdictStatus};

use super::fixture_output;

fn parse_fixture(name: &str) -> Verdict {
    let outcome = ExecutionOutcome {
        stdout: fixture_output(name),
        exit_code: Some(0),
        wall_time: 0.25,
        ..Default::default()
    };
    verdict::parse(&outcome).expect_total(2)
}

#[test]
fn test_all_pass() {
    let verdict = parse_fixture("all_pass.txt");

    assert!(verdict.success);
    assert!(verdict.all_passed());
    assert_eq!(verdict.status, VerdictStatus::Completed);
    assert_eq!((verdict.passed, verdict.total), (2, 2));
    assert_eq!(verdict.cases[1].args, vec![-5, -3]);
    assert_eq!(verdict.cases[1].outcome, CaseOutcome::Value("-8".to_string()));
    assert!(verdict.error.is_none());
}

#[test]
fn test_all_fail_is_still_a_completed_run() {
    let verdict = parse_fixture("all_fail.txt");

    assert!(verdict.success);
    assert!(!verdict.all_passed());
    assert_eq!((verdict.passed, verdict.total), (0, 2));
    assert!(verdict.cases.iter().all(|c| !c.expected_match));
    assert_eq!(verdict.cases[0].outcome, CaseOutcome::Value("0".to_string()));
}

#[test]
fn test_all_error_keeps_exception_detail() {
    let verdict = parse_fixture("all_error.txt");

    assert!(verdict.success);
    assert_eq!((verdict.passed, verdict.total), (0, 2));
    for case in &verdict.cases {
        assert_eq!(
            case.outcome,
            CaseOutcome::Error("ValueError: no adding today".to_string())
        );
    }
}

#[test]
fn test_mixed_results() {
    let verdict = parse_fixture("mixed.txt");

    assert_eq!(verdict.status, VerdictStatus::Completed);
    assert_eq!((verdict.passed, verdict.total), (1, 2));
    assert!(matches!(
        verdict.cases[1].outcome,
        CaseOutcome::Error(ref e) if e.starts_with("RangeError")
    ));
}

#[test]
fn test_summary_disagreeing_with_cases_is_malformed() {
    let verdict = parse_fixture("summary_mismatch.txt");

    assert!(!verdict.success);
    assert_eq!(verdict.status, VerdictStatus::MalformedOutput);
    assert_eq!(verdict.passed, 0);
    assert!(verdict.error.unwrap().contains("2/2"));
}

#[test]
fn test_missing_summary_is_malformed() {
    let verdict = parse_fixture("missing_summary.txt");

    assert!(!verdict.success);
    assert_eq!(verdict.status, VerdictStatus::MalformedOutput);
    assert_eq!(verdict.cases.len(), 1);
}

#[test]
fn test_unrecognized_lines_are_ignored() {
    let verdict = parse_fixture("interleaved_noise.txt");

    assert_eq!(verdict.status, VerdictStatus::Completed);
    assert_eq!((verdict.passed, verdict.total), (2, 2));
    assert!(verdict.output.contains("Restore complete"));
}

#[test]
fn test_verdict_json_shape() {
    let verdict = parse_fixture("mixed.txt");
    let json = serde_json::to_value(&verdict).unwrap();

    assert_eq!(json["status"], "completed");
    assert_eq!(json["success"], true);
    assert_eq!(json["cases"][0]["outcome"]["kind"], "value");
    assert_eq!(json["cases"][1]["outcome"]["kind"], "error");
    assert!(json.get("error").is_none());
}
