//! Docker-backed sandbox
//!
//! Each run gets an exclusively owned [`Workspace`] directory from a
//! [`WorkspacePool`]. The workspace is bind-mounted into a throwaway
//! container started through the `docker` CLI, whose output is captured
//! under a wall-clock limit.
//!
//! References for the flags used:
//! - https://docs.docker.com/reference/cli/docker/container/run/
//! - https://docs.docker.com/engine/containers/resource_constraints/

use std::path::PathBuf;

use thiserror::Error;

pub use crate::sandbox::command::{DockerAction, DockerCommand, WorkspaceMount};
pub use crate::sandbox::process::{
    CappedBuffer, Captured, capture, docker_version, pull_image, remove_container, run_container,
};
pub use crate::sandbox::workspace::{Workspace, WorkspacePool};

mod command;
mod process;
mod workspace;

/// Errors that occur while preparing or driving a sandboxed run
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("docker command failed: {0}")]
    CommandFailed(String),

    #[error("failed to create workspace {path}: {source}")]
    WorkspaceCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("workspace pool is closed")]
    PoolClosed,

    #[error("run was cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
