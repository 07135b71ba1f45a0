//! Process spawning and output capture for docker
//!
//! Runs the docker client, drains its stdout and stderr concurrently into
//! bounded buffers, and enforces the wall-clock limit and cancellation.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::sandbox::SandboxError;
use crate::sandbox::command::{DockerAction, DockerCommand};
use crate::sandbox::workspace::Workspace;

/// Bound on how long a `docker rm` or `docker version` may take
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on how long a `docker pull` may take
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

/// Output buffer that keeps at most `limit` bytes and drains the rest
#[derive(Debug, Default)]
pub struct CappedBuffer {
    data: Vec<u8>,
    limit: Option<usize>,
    truncated: bool,
}

impl CappedBuffer {
    /// Create a buffer; `None` means unbounded
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            data: Vec::new(),
            limit,
            truncated: false,
        }
    }

    /// Append a chunk, dropping whatever exceeds the limit
    pub fn push(&mut self, chunk: &[u8]) {
        let room = match self.limit {
            Some(limit) => limit.saturating_sub(self.data.len()),
            None => chunk.len(),
        };
        let take = room.min(chunk.len());
        self.data.extend_from_slice(&chunk[..take]);
        if take < chunk.len() {
            self.truncated = true;
        }
    }

    /// Read `reader` to EOF. Reading continues past the limit so the writer
    /// never blocks on a full pipe.
    pub async fn fill<R>(&mut self, reader: Option<&mut R>) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let Some(reader) = reader else {
            return Ok(());
        };
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            self.push(&chunk[..n]);
        }
    }

    /// Whether any bytes were dropped
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode as UTF-8, replacing invalid sequences
    pub fn into_string(self) -> String {
        match String::from_utf8(self.data) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

/// Everything observed from one process run
#[derive(Debug)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    /// Exit status, absent if the process was killed by us
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
    pub output_truncated: bool,
    pub elapsed: Duration,
}

enum Ended {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "kill failed, process likely exited");
    }
    let _ = child.wait().await;
}

/// Run `args` to completion, capturing its output.
///
/// The process is killed when `wall_time` elapses (reported as
/// `timed_out`) or when `cancel` fires (reported as
/// [`SandboxError::Cancelled`]). Each stream keeps at most `max_output`
/// bytes.
pub async fn capture(
    args: &[String],
    wall_time: Duration,
    max_output: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Captured, SandboxError> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| SandboxError::CommandFailed("empty command arguments".to_string()))?;

    let start = Instant::now();
    let mut child = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SandboxError::SpawnFailed {
            program: program.clone(),
            source,
        })?;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout = CappedBuffer::new(max_output);
    let mut stderr = CappedBuffer::new(max_output);

    let ended = {
        let run = async {
            let (status, (), ()) = tokio::try_join!(
                child.wait(),
                stdout.fill(stdout_pipe.as_mut()),
                stderr.fill(stderr_pipe.as_mut()),
            )?;
            Ok::<_, std::io::Error>(status)
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Ended::Cancelled,
            result = tokio::time::timeout(wall_time, run) => match result {
                Ok(status) => Ended::Exited(status?),
                Err(_) => Ended::TimedOut,
            },
        }
    };

    let status = match ended {
        Ended::Exited(status) => Some(status),
        Ended::TimedOut => {
            kill(&mut child).await;
            None
        }
        Ended::Cancelled => {
            kill(&mut child).await;
            return Err(SandboxError::Cancelled);
        }
    };

    let elapsed = start.elapsed();
    let output_truncated = stdout.is_truncated() || stderr.is_truncated();

    Ok(Captured {
        stdout: stdout.into_string(),
        stderr: stderr.into_string(),
        status,
        timed_out: status.is_none(),
        output_truncated,
        elapsed,
    })
}

/// Run a container for `workspace` and capture its output
///
/// On timeout or cancellation the docker client is killed and the container
/// is force-removed before returning.
#[instrument(skip(workspace, command, cancel), fields(workspace = %workspace.name()))]
pub async fn run_container(
    workspace: &mut Workspace,
    command: DockerCommand,
    wall_time: Duration,
    max_output: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Captured, SandboxError> {
    let docker_path = command.docker_path().to_path_buf();
    let args = command.name(workspace.name()).build();
    debug!(?args, "running docker command");

    workspace.mark_container_started();
    let result = capture(&args, wall_time, max_output, cancel).await;

    if container_may_be_live(&result) {
        warn!(wall_time = wall_time.as_secs_f64(), "stopping container");
        match remove_container(&docker_path, workspace.name()).await {
            Ok(()) => workspace.mark_container_removed(),
            Err(e) => warn!(error = %e, "container removal failed"),
        }
    } else {
        workspace.mark_container_removed();
    }

    if let Ok(ref captured) = result {
        debug!(
            code = ?captured.status.and_then(|s| s.code()),
            timed_out = captured.timed_out,
            elapsed = captured.elapsed.as_secs_f64(),
            "container finished"
        );
    }

    result
}

/// Whether the container may outlive the docker client
///
/// `--rm` only removes the container once the client saw it exit. A client
/// that was killed or lost its pipes leaves the container running; one that
/// never spawned never created it.
fn container_may_be_live(result: &Result<Captured, SandboxError>) -> bool {
    match result {
        Ok(captured) => captured.timed_out,
        Err(SandboxError::SpawnFailed { .. }) => false,
        Err(_) => true,
    }
}

/// Run a short docker command and return its stdout
async fn control(args: Vec<String>, timeout: Duration) -> Result<String, SandboxError> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| SandboxError::CommandFailed("empty command arguments".to_string()))?;

    let output = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();
    let output = tokio::time::timeout(timeout, output)
        .await
        .map_err(|_| SandboxError::CommandFailed(format!("{program} timed out")))?
        .map_err(|source| SandboxError::SpawnFailed {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SandboxError::CommandFailed(stderr.trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Force-remove a container; a container that is already gone is not an error
pub async fn remove_container(docker_path: &Path, name: &str) -> Result<(), SandboxError> {
    let args = DockerCommand::new(docker_path)
        .action(DockerAction::Remove)
        .name(name)
        .build();

    match control(args, CONTROL_TIMEOUT).await {
        Ok(_) => {
            debug!(container = name, "container removed");
            Ok(())
        }
        Err(SandboxError::CommandFailed(message)) if message.contains("No such container") => {
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Query the docker daemon version
#[instrument]
pub async fn docker_version(docker_path: &Path) -> Result<String, SandboxError> {
    let args = DockerCommand::new(docker_path)
        .action(DockerAction::Version)
        .build();
    control(args, CONTROL_TIMEOUT).await
}

/// Pull an image so later runs do not spend their wall time downloading it
#[instrument]
pub async fn pull_image(docker_path: &Path, image: &str) -> Result<(), SandboxError> {
    let args = DockerCommand::new(docker_path)
        .action(DockerAction::Pull)
        .image(image)
        .build();
    control(args, PULL_TIMEOUT).await?;
    debug!(image, "image pulled");
    Ok(())
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn capped_buffer_never_exceeds_limit(
            limit in 0usize..256,
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16),
        ) {
            let mut buf = CappedBuffer::new(Some(limit));
            let total: usize = chunks.iter().map(Vec::len).sum();
            for chunk in &chunks {
                buf.push(chunk);
            }
            prop_assert!(buf.len() <= limit);
            prop_assert_eq!(buf.len(), total.min(limit));
            prop_assert_eq!(buf.is_truncated(), total > limit);
        }
    }
}
