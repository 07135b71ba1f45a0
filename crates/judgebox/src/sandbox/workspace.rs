//! Per-run workspace lifecycle
//!
//! A workspace is a fresh directory under the configured root that holds one
//! generated program. Its name is also the name of the container that runs
//! it, so a workspace identifies everything a run leaves behind.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::sandbox::SandboxError;
use crate::sandbox::command::{DockerAction, DockerCommand};
use crate::sandbox::process::remove_container;

/// An exclusively owned run directory
///
/// # Cleanup
///
/// Call [`release()`](Self::release) when the run is over. It removes the
/// container (if one was started) and deletes the directory. If a workspace
/// is dropped without being released, for example because the run future was
/// abandoned, `Drop` deletes the directory synchronously and removes the
/// container from a spawned thread.
#[derive(Debug)]
pub struct Workspace {
    /// Unique name, shared with the container
    name: String,

    /// Host path of the directory
    path: PathBuf,

    /// Path to the docker binary
    docker_path: PathBuf,

    /// Whether a container may exist under this name
    container_started: bool,

    /// Whether release() completed
    released: bool,

    /// Pool permit (if acquired from a pool)
    _permit: Option<OwnedSemaphorePermit>,
}

impl Workspace {
    /// Get the workspace name (also the container name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the host path of the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the host path to a file inside the workspace
    ///
    /// Returns an error if the name could escape the workspace.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, SandboxError> {
        let relative = Path::new(name);
        let confined = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !confined {
            return Err(SandboxError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.path.join(relative))
    }

    /// Write a file into the workspace
    #[instrument(skip(self, content))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<(), SandboxError> {
        let path = self.file_path(name)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to workspace");
        Ok(())
    }

    /// Read a file from the workspace
    pub async fn read_file(&self, name: &str) -> Result<Vec<u8>, SandboxError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::read(&path).await?)
    }

    /// Record that a container named after this workspace may be running
    pub(crate) fn mark_container_started(&mut self) {
        self.container_started = true;
    }

    /// Record that the container is known to be gone
    pub(crate) fn mark_container_removed(&mut self) {
        self.container_started = false;
    }

    /// Remove the container and delete the directory
    #[must_use = "release errors should be handled"]
    #[instrument(skip(self), fields(workspace = %self.name))]
    pub async fn release(mut self) -> Result<(), SandboxError> {
        self.cleanup().await
    }

    /// Release in place; on error the remainder is left to `Drop`
    async fn cleanup(&mut self) -> Result<(), SandboxError> {
        if self.container_started {
            remove_container(&self.docker_path, &self.name).await?;
            self.container_started = false;
        }

        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove workspace");
                return Err(e.into());
            }
        }

        self.released = true;
        debug!("workspace released");
        Ok(())
    }

    /// Check if the workspace has been released
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        debug!(
            workspace = %self.name,
            "workspace dropped without release, cleaning up"
        );

        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove workspace");
        }

        if self.container_started {
            // The thread may not finish before process exit
            let args = DockerCommand::new(&self.docker_path)
                .action(DockerAction::Remove)
                .name(&self.name)
                .build();
            let name = self.name.clone();

            std::thread::spawn(move || {
                let Some((program, rest)) = args.split_first() else {
                    return;
                };
                match std::process::Command::new(program).args(rest).output() {
                    Ok(output) if output.status.success() => {
                        debug!(container = %name, "container removed");
                    }
                    Ok(output) => {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        warn!(
                            container = %name,
                            stderr = %stderr.trim(),
                            "container removal failed"
                        );
                    }
                    Err(e) => {
                        warn!(container = %name, error = %e, "container removal spawn failed");
                    }
                }
            });
        }
    }
}

/// Allocator for uniquely named workspaces
///
/// Names are `<prefix>-<pid>-<seq>`. The sequence number comes from an atomic
/// counter and the directory is created with `create_dir`, so an existing
/// path (say, left over from an earlier process with the same pid) is
/// skipped rather than reused.
#[derive(Debug)]
pub struct WorkspacePool {
    /// Directory workspaces are created in
    root: PathBuf,

    /// Name prefix
    prefix: String,

    /// Path to the docker binary
    docker_path: PathBuf,

    /// Number of workspaces that may exist at once
    capacity: u32,

    /// Semaphore to limit concurrent runs
    semaphore: Arc<Semaphore>,

    /// Next sequence number
    next_id: AtomicU64,
}

impl WorkspacePool {
    /// Create a new workspace pool
    pub fn new(
        root: impl Into<PathBuf>,
        prefix: impl Into<String>,
        capacity: u32,
        docker_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            docker_path: docker_path.into(),
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a pool from the workspace settings in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.workspace_root,
            &config.container_prefix,
            config.max_concurrent_runs,
            config.docker_binary(),
        )
    }

    /// Acquire a fresh workspace, waiting if the pool is at capacity
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<Workspace, SandboxError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SandboxError::PoolClosed)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| SandboxError::WorkspaceCreate {
                path: self.root.clone(),
                source,
            })?;

        loop {
            let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
            let name = format!("{}-{}-{seq}", self.prefix, std::process::id());
            let path = self.root.join(&name);

            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    debug!(%name, "acquired workspace");
                    return Ok(Workspace {
                        name,
                        path,
                        docker_path: self.docker_path.clone(),
                        container_started: false,
                        released: false,
                        _permit: Some(permit),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(%name, "workspace path taken, skipping");
                }
                Err(source) => return Err(SandboxError::WorkspaceCreate { path, source }),
            }
        }
    }

    /// Stop handing out workspaces; pending and future acquires fail
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Get the number of runs that can start without waiting
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the maximum number of concurrent workspaces
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Get the directory workspaces are created in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the path to the docker binary
    pub fn docker_path(&self) -> &Path {
        &self.docker_path
    }
}
