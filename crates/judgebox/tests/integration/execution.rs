use judgebox::{CaseOutcome, ResourceLimits, RunRequest, VerdictStatus};

use super::{fixture_source, leftover_workspaces, test_runner};

#[tokio::test]
#[ignore = "requires docker"]
async fn test_correct_add_in_every_language() {
    let (runner, root) = test_runner();
    let sources = [
        ("python", "add_correct.py"),
        ("javascript", "add_correct.js"),
        ("csharp", "add_correct.cs"),
    ];

    for (language, file) in sources {
        let verdict = runner
            .run(&fixture_source(file), language)
            .await
            .unwrap_or_else(|e| panic!("{language}: {e}"));

        assert!(verdict.success, "{language}: {:?}", verdict.error);
        assert_eq!(verdict.status, VerdictStatus::Completed);
        assert_eq!((verdict.passed, verdict.total), (2, 2), "{language}");
    }

    assert_eq!(leftover_workspaces(&root), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_wrong_add_completes_with_no_passes() {
    let (runner, _root) = test_runner();

    let verdict = runner
        .run(&fixture_source("add_wrong.py"), "python")
        .await
        .expect("Run failed");

    assert!(verdict.success);
    assert_eq!((verdict.passed, verdict.total), (0, 2));
    assert_eq!(verdict.cases[0].outcome, CaseOutcome::Value("0".to_string()));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_throwing_add_reports_each_case() {
    let (runner, _root) = test_runner();

    let verdict = runner
        .run(&fixture_source("add_throws.py"), "python")
        .await
        .expect("Run failed");
    assert!(verdict.success);
    assert_eq!((verdict.passed, verdict.total), (0, 2));
    assert!(verdict.cases.iter().all(|c| matches!(
        c.outcome,
        CaseOutcome::Error(ref e) if e == "ValueError: no adding today"
    )));

    let verdict = runner
        .run(&fixture_source("add_throws.js"), "javascript")
        .await
        .expect("Run failed");
    assert!(verdict.success);
    assert!(verdict.cases.iter().all(|c| matches!(
        c.outcome,
        CaseOutcome::Error(ref e) if e.starts_with("RangeError")
    )));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_user_output_cannot_spoof_results() {
    let (runner, _root) = test_runner();
    let sources = [
        ("python", "add_spoofs.py"),
        ("python", "add_spoofs_print.py"),
        ("python", "add_spoofs_builtins.py"),
        ("python", "add_spoofs_eq.py"),
        ("javascript", "add_spoofs.js"),
    ];

    for (language, file) in sources {
        let verdict = runner
            .run(&fixture_source(file), language)
            .await
            .unwrap_or_else(|e| panic!("{file}: {e}"));

        assert!(verdict.success, "{file}: {:?}", verdict.error);
        assert_eq!((verdict.passed, verdict.total), (0, 2), "{file}");
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_process_exit_is_a_harness_failure() {
    let (runner, _root) = test_runner();

    let verdict = runner
        .run(&fixture_source("add_exits.py"), "python")
        .await
        .expect("Run failed");

    assert!(!verdict.success);
    assert_eq!(verdict.status, VerdictStatus::HarnessFailed);
    assert!(verdict.error.unwrap().starts_with("exited with code 3"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_infinite_loop_times_out() {
    let (runner, root) = test_runner();
    let request = RunRequest::new(fixture_source("add_loops.py"), "python")
        .with_limits(ResourceLimits::unset().with_wall_time_limit(3.0));

    let started = std::time::Instant::now();
    let verdict = runner.run_request(request).await.expect("Run failed");

    assert!(!verdict.success);
    assert_eq!(verdict.status, VerdictStatus::TimedOut);
    assert!(verdict.cases.is_empty());
    assert!(started.elapsed() < std::time::Duration::from_secs(30));
    assert_eq!(leftover_workspaces(&root), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_ping_reports_server_version() {
    let (runner, _root) = test_runner();
    let version = runner.ping().await.expect("Docker is not reachable");
    assert!(!version.is_empty());
}
