//! Integration tests for judgebox
//!
//! Run with: cargo test -p judgebox --features integration-tests
//!
//! Tests that start containers need a reachable Docker daemon and are marked
//! `#[ignore]`. To include them:
//!    cargo test -p judgebox --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use std::fs;

use judgebox::{Config, Runner};
use tempfile::TempDir;

mod concurrency;
mod config_loading;
mod execution;
mod harness_generation;
mod verdict_fixtures;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get a submission fixture
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Helper to get a captured harness output fixture
pub(crate) fn fixture_output(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/outputs/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Default config with workspaces under a fresh temporary directory
pub(crate) fn test_config() -> (Config, TempDir) {
    let root = tempfile::tempdir().expect("Failed to create workspace root");
    let config = Config {
        workspace_root: root.path().to_path_buf(),
        container_prefix: "judgebox-test".to_string(),
        ..Config::default()
    };
    (config, root)
}

pub(crate) fn test_runner() -> (Runner, TempDir) {
    let (config, root) = test_config();
    (Runner::new(config), root)
}

/// Number of entries left under a workspace root
pub(crate) fn leftover_workspaces(root: &TempDir) -> usize {
    fs::read_dir(root.path())
        .map(|entries| entries.count())
        .unwrap_or(0)
}
