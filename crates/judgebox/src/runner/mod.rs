//! Code runner for judgebox
//!
//! Ties the pieces together: language lookup, harness generation, sandboxed
//! execution and result parsing.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub use crate::runner::execute::execute;

mod execute;

use crate::{
    config::{Config, Language},
    harness::{self, HarnessError},
    sandbox::{self, SandboxError, WorkspacePool},
    types::{ExecutionOutcome, ResourceLimits, TestCase},
    verdict::{self, Verdict},
};

/// Errors that prevent a run from producing a verdict
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("harness generation failed: {0}")]
    Harness(#[from] HarnessError),

    #[error("run was cancelled")]
    Cancelled,

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("run task failed: {0}")]
    TaskFailed(String),
}

/// A request to judge one submission
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Source code defining `add`
    pub code: String,
    /// Language ID
    pub language: String,
    /// Overrides applied on top of the configured limits
    pub limits: Option<ResourceLimits>,
}

impl RunRequest {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            limits: None,
        }
    }

    /// Override resource limits for this run
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// A run executing on its own task
///
/// Dropping the handle cancels the run.
#[derive(Debug)]
pub struct RunHandle {
    task: JoinHandle<Result<Verdict, RunError>>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Ask the run to stop; the container is killed and the workspace released
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if the run has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the verdict
    pub async fn wait(mut self) -> Result<Verdict, RunError> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(RunError::Cancelled),
            Err(e) => Err(RunError::TaskFailed(e.to_string())),
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// High-level runner for judging submissions
///
/// Cheap to clone; clones share the configuration and the workspace pool.
#[derive(Debug, Clone)]
pub struct Runner {
    config: Arc<Config>,
    pool: Arc<WorkspacePool>,
    cases: Arc<[TestCase]>,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        let pool = WorkspacePool::from_config(&config);
        Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
            cases: TestCase::defaults().into(),
        }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the workspace pool
    pub fn pool(&self) -> &WorkspacePool {
        &self.pool
    }

    /// The test cases every submission is checked against
    pub fn test_cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Language IDs and display names, sorted by ID
    pub fn languages(&self) -> Vec<(&str, &str)> {
        self.config.language_list()
    }

    fn language(&self, id: &str) -> Result<&Language, RunError> {
        self.config
            .get_language(id)
            .map_err(|_| RunError::UnsupportedLanguage(id.to_string()))
    }

    /// Generate the harness program without running it
    pub fn generate(&self, code: &str, language: &str) -> Result<String, RunError> {
        let lang = self.language(language)?;
        if code.len() > self.config.max_code_bytes {
            return Err(HarnessError::CodeTooLarge {
                len: code.len(),
                max: self.config.max_code_bytes,
            }
            .into());
        }
        Ok(harness::generate(lang, code, &self.cases)?)
    }

    /// Judge `code` written in `language` with the configured limits
    pub async fn run(&self, code: &str, language: &str) -> Result<Verdict, RunError> {
        self.run_request(RunRequest::new(code, language)).await
    }

    /// Judge a request
    pub async fn run_request(&self, request: RunRequest) -> Result<Verdict, RunError> {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    /// Judge a request, stopping early if `cancel` fires
    #[instrument(skip(self, request, cancel), fields(language = %request.language))]
    pub async fn run_with_cancel(
        &self,
        request: RunRequest,
        cancel: &CancellationToken,
    ) -> Result<Verdict, RunError> {
        let language = self.language(&request.language)?;
        let program = self.generate(&request.code, &request.language)?;
        let limits = self
            .config
            .effective_limits(language, request.limits.as_ref());

        let outcome = execute(&self.pool, &self.config, language, &program, &limits, cancel).await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(SandboxError::Cancelled) => return Err(RunError::Cancelled),
            Err(e) => {
                warn!(error = %e, "sandbox failure");
                ExecutionOutcome::infrastructure(e.to_string())
            }
        };

        let verdict = verdict::parse(&outcome).expect_total(self.cases.len());
        info!(
            status = ?verdict.status,
            passed = verdict.passed,
            total = verdict.total,
            wall_time = outcome.wall_time,
            "run finished"
        );
        Ok(verdict)
    }

    /// Start a run on its own task
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(&self, request: RunRequest) -> RunHandle {
        let runner = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { runner.run_with_cancel(request, &token).await });
        RunHandle { task, cancel }
    }

    /// Check that the container runtime is reachable; returns its version
    pub async fn ping(&self) -> Result<String, RunError> {
        Ok(sandbox::docker_version(&self.config.docker_binary()).await?)
    }

    /// Pull the images for the given languages, or for all when empty
    #[instrument(skip(self))]
    pub async fn pull_images(&self, languages: &[String]) -> Result<(), RunError> {
        let ids: Vec<String> = if languages.is_empty() {
            self.languages()
                .into_iter()
                .map(|(id, _)| id.to_string())
                .collect()
        } else {
            languages.to_vec()
        };

        let docker = self.config.docker_binary();
        for id in &ids {
            let language = self.language(id)?;
            info!(language = %id, image = %language.image, "pulling image");
            sandbox::pull_image(&docker, &language.image).await?;
        }
        Ok(())
    }
}
