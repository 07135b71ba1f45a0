//! Command builder for the docker CLI
//!
//! Builds command-line arguments for running a harness in a container.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::PullPolicy;
use crate::types::ResourceLimits;

/// Host directory bind-mounted into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMount {
    pub source: PathBuf,
    pub target: String,
    pub writable: bool,
}

/// Builder for docker command-line arguments
#[derive(Debug)]
pub struct DockerCommand {
    /// Path to the docker binary
    docker_path: PathBuf,
    /// One of run, rm, pull, version
    action: DockerAction,
    /// --name, also the target of `rm`
    name: Option<String>,
    image: Option<String>,
    limits: ResourceLimits,
    /// --volume
    mount: Option<WorkspaceMount>,
    /// --env, sorted so the argument list is stable
    env: BTreeMap<String, String>,
    /// --workdir
    working_dir: Option<String>,
    /// --user
    user: Option<String>,
    network: bool,
    pull_policy: PullPolicy,
    command: Vec<String>,
}

impl DockerCommand {
    /// Create a new docker command builder
    pub fn new(docker_path: impl Into<PathBuf>) -> Self {
        Self {
            docker_path: docker_path.into(),
            action: DockerAction::Run,
            name: None,
            image: None,
            limits: ResourceLimits::unset(),
            mount: None,
            env: BTreeMap::new(),
            working_dir: None,
            user: None,
            network: false,
            pull_policy: PullPolicy::default(),
            command: Vec::new(),
        }
    }

    /// Set the action to perform
    pub fn action(mut self, action: DockerAction) -> Self {
        self.action = action;
        self
    }

    /// Set the container name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the image to run or pull
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set resource limits
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Bind-mount a host directory
    pub fn mount(mut self, mount: WorkspaceMount) -> Self {
        self.mount = Some(mount);
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add several environment variables
    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the working directory inside the container
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Run as the given user instead of the image default
    pub fn user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Allow network access
    pub fn network(mut self, enable: bool) -> Self {
        self.network = enable;
        self
    }

    /// Set the image pull policy
    pub fn pull_policy(mut self, policy: PullPolicy) -> Self {
        self.pull_policy = policy;
        self
    }

    /// Set the command run inside the container
    pub fn command(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Build the command-line arguments
    ///
    /// Consumes self to avoid cloning the command vector.
    pub fn build(self) -> Vec<String> {
        let mut args = vec![self.docker_path.to_string_lossy().into_owned()];

        match self.action {
            DockerAction::Version => {
                args.push("version".to_string());
                args.push("--format".to_string());
                args.push("{{.Server.Version}}".to_string());
            }
            DockerAction::Pull => {
                args.push("pull".to_string());
                args.push("--quiet".to_string());
                args.extend(self.image);
            }
            DockerAction::Remove => {
                args.push("rm".to_string());
                args.push("--force".to_string());
                args.extend(self.name);
            }
            DockerAction::Run => {
                args.push("run".to_string());
                args.push("--rm".to_string());
                if let Some(ref name) = self.name {
                    args.push(format!("--name={name}"));
                }

                // Isolation
                if !self.network {
                    args.push("--network=none".to_string());
                }
                args.push("--cap-drop=ALL".to_string());
                args.push("--security-opt=no-new-privileges".to_string());
                args.push(format!("--pull={}", self.pull_policy.as_str()));

                // Resource limits
                if let Some(memory) = self.limits.memory_limit {
                    args.push(format!("--memory={memory}k"));
                    args.push(format!("--memory-swap={memory}k"));
                }
                if let Some(cpus) = self.limits.cpus {
                    args.push(format!("--cpus={cpus}"));
                }
                if let Some(procs) = self.limits.max_processes {
                    args.push(format!("--pids-limit={procs}"));
                }
                if let Some(time) = self.limits.time_limit {
                    // RLIMIT_CPU has whole-second granularity
                    let secs = time.ceil().max(1.0) as u64;
                    args.push(format!("--ulimit=cpu={secs}:{secs}"));
                }
                if let Some(open_files) = self.limits.max_open_files {
                    args.push(format!("--ulimit=nofile={open_files}:{open_files}"));
                }

                // Workspace
                if let Some(ref mount) = self.mount {
                    let mode = if mount.writable { "rw" } else { "ro" };
                    args.push(format!(
                        "--volume={}:{}:{mode}",
                        mount.source.display(),
                        mount.target
                    ));
                }
                if let Some(ref dir) = self.working_dir {
                    args.push(format!("--workdir={dir}"));
                }
                if let Some(ref user) = self.user {
                    args.push(format!("--user={user}"));
                }

                // Environment
                for (key, value) in &self.env {
                    args.push(format!("--env={key}={value}"));
                }

                // Image and command
                args.extend(self.image);
                args.extend(self.command);
            }
        }

        args
    }

    /// Get the docker binary path
    pub fn docker_path(&self) -> &Path {
        &self.docker_path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerAction {
    /// Start a container and wait for it
    Run,
    /// Force-remove a container by name
    Remove,
    /// Fetch an image
    Pull,
    /// Query the daemon version
    Version,
}
