//! A library for judging untrusted code submissions.
//!
//! Judgebox wraps a submitted `add` function in a generated test harness,
//! runs it in a throwaway Docker container, and turns the output into a
//! structured [`Verdict`].
//!
//! # Features
//!
//! - **Workspace per run**: Every run gets its own directory and container name, released on every path.
//! - **Data-driven languages**: Harness templates, images and commands live in TOML configuration.
//! - **Resource limits**: Enforce CPU time, memory, wall time, processes, open files and output size.
//! - **Cancellation**: Abandoned runs kill their container and clean up.
//!
//! ```rust,ignore
//! let runner = judgebox::Runner::with_defaults();
//! let verdict = runner.run("def add(a, b):\n    return a + b\n", "python").await?;
//! assert_eq!(verdict.passed, 2);
//! ```

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language, PullPolicy};
pub use harness::HarnessError;
pub use runner::{RunError, RunHandle, RunRequest, Runner};
pub use sandbox::{SandboxError, Workspace, WorkspacePool};
pub use types::{ExecutionOutcome, ResourceLimits, TestCase};
pub use verdict::{CaseOutcome, CaseResult, Verdict, VerdictStatus};

pub mod config;
pub mod harness;
pub mod runner;
pub mod sandbox;
pub mod types;
pub mod verdict;
