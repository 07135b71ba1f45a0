use std::time::Duration;

use judgebox::{Config, RunError, RunRequest, Runner};

use super::{fixture_source, leftover_workspaces, test_config, test_runner};

#[tokio::test]
#[ignore = "requires docker"]
async fn test_concurrent_runs_get_independent_verdicts() {
    let (runner, root) = test_runner();
    let code = fixture_source("add_correct.py");

    let handles: Vec<_> = (0..8)
        .map(|_| runner.spawn(RunRequest::new(code.clone(), "python")))
        .collect();

    for handle in handles {
        let verdict = handle.wait().await.expect("Run failed");
        assert!(verdict.success, "{:?}", verdict.error);
        assert_eq!((verdict.passed, verdict.total), (2, 2));
    }

    assert_eq!(leftover_workspaces(&root), 0);
    assert_eq!(runner.pool().available(), runner.pool().capacity() as usize);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_mixed_submissions_do_not_interfere() {
    let (config, root) = test_config();
    let runner = Runner::new(Config {
        max_concurrent_runs: 2,
        ..config
    });

    let correct = runner.spawn(RunRequest::new(fixture_source("add_correct.py"), "python"));
    let wrong = runner.spawn(RunRequest::new(fixture_source("add_wrong.py"), "python"));
    let js = runner.spawn(RunRequest::new(fixture_source("add_correct.js"), "javascript"));

    let (correct, wrong, js) = tokio::join!(correct.wait(), wrong.wait(), js.wait());
    assert_eq!(correct.expect("Run failed").passed, 2);
    assert_eq!(wrong.expect("Run failed").passed, 0);
    assert_eq!(js.expect("Run failed").passed, 2);
    assert_eq!(leftover_workspaces(&root), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_cancel_running_container() {
    let (runner, root) = test_runner();
    let handle = runner.spawn(RunRequest::new(fixture_source("add_loops.py"), "python"));

    tokio::time::sleep(Duration::from_secs(2)).await;
    handle.cancel();

    assert!(matches!(handle.wait().await, Err(RunError::Cancelled)));
    assert_eq!(leftover_workspaces(&root), 0);
    assert_eq!(runner.pool().available(), runner.pool().capacity() as usize);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_dropped_run_future_releases_workspace() {
    let (runner, root) = test_runner();
    let code = fixture_source("add_loops.py");

    let run = runner.run(&code, "python");
    let result = tokio::time::timeout(Duration::from_secs(2), run).await;
    assert!(result.is_err());

    // Drop cleanup removes the container on a background thread
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(leftover_workspaces(&root), 0);
    assert_eq!(runner.pool().available(), runner.pool().capacity() as usize);
}
