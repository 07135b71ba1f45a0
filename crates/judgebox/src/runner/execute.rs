//! Execution step for code running
//!
//! Materializes a generated harness in a fresh workspace and runs it in a
//! container.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::{Config, Language};
use crate::sandbox::{
    Captured, DockerCommand, SandboxError, Workspace, WorkspaceMount, WorkspacePool,
    run_container,
};
use crate::types::{ExecutionOutcome, ResourceLimits};

/// Exit codes the docker client uses for its own failures: the daemon
/// rejected the run (125), the command could not be invoked (126) or was not
/// found (127). A program inside the container may exit with these too, so
/// they only count when stderr carries a docker client error.
const RUNTIME_EXIT_CODES: std::ops::RangeInclusive<i32> = 125..=127;

/// Find the line the docker client printed about its own failure
fn runtime_error_line(stderr: &str) -> Option<&str> {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("docker: ") || l.contains("Error response from daemon"))
}

/// Execute a harness program in a fresh container
///
/// The workspace is released on every path, including cancellation. Only
/// [`SandboxError::Cancelled`] and failures that prevent the run from
/// starting are returned as errors.
#[instrument(
    skip(pool, config, language, program, limits, cancel),
    fields(language = %language.name)
)]
pub async fn execute(
    pool: &WorkspacePool,
    config: &Config,
    language: &Language,
    program: &str,
    limits: &ResourceLimits,
    cancel: &CancellationToken,
) -> Result<ExecutionOutcome, SandboxError> {
    let mut workspace = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(SandboxError::Cancelled),
        workspace = pool.acquire() => workspace?,
    };

    let result = run_in(&mut workspace, config, language, program, limits, cancel).await;

    if let Err(e) = workspace.release().await {
        warn!(error = %e, "failed to release workspace");
    }

    result
}

async fn run_in(
    workspace: &mut Workspace,
    config: &Config,
    language: &Language,
    program: &str,
    limits: &ResourceLimits,
    cancel: &CancellationToken,
) -> Result<ExecutionOutcome, SandboxError> {
    let source_name = language.source_name();
    workspace
        .write_file(&source_name, program.as_bytes())
        .await?;

    let run_cmd = language.run_command();
    debug!(?run_cmd, "executing program");

    let command = DockerCommand::new(config.docker_binary())
        .image(&language.image)
        .limits(limits.clone())
        .mount(WorkspaceMount {
            source: workspace.path().to_path_buf(),
            target: language.run.workdir.clone(),
            writable: language.run.writable_workspace,
        })
        .working_dir(&language.run.workdir)
        .envs(&language.run.env)
        .user(language.run.user.clone())
        .network(language.run.network)
        .pull_policy(config.pull_policy)
        .command(run_cmd);

    let captured = run_container(
        workspace,
        command,
        limits.wall_time(),
        limits.max_output_bytes(),
        cancel,
    )
    .await?;

    Ok(to_outcome(captured))
}

/// Classify a finished container run
fn to_outcome(captured: Captured) -> ExecutionOutcome {
    let exit_code = captured.status.and_then(|s| s.code());

    let infrastructure_error = match exit_code {
        Some(code) if RUNTIME_EXIT_CODES.contains(&code) => runtime_error_line(&captured.stderr)
            .map(|line| format!("container runtime failed (exit code {code}): {line}")),
        _ => None,
    };

    ExecutionOutcome {
        stdout: captured.stdout,
        stderr: captured.stderr,
        exit_code,
        timed_out: captured.timed_out,
        infrastructure_error,
        wall_time: captured.elapsed.as_secs_f64(),
        output_truncated: captured.output_truncated,
    }
}
