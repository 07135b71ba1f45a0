use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU time limit in seconds (enforced as `RLIMIT_CPU` inside the container)
    #[serde(default)]
    pub time_limit: Option<f64>,

    /// Wall clock time limit in seconds, measured from container launch
    #[serde(default)]
    pub wall_time_limit: Option<f64>,

    /// Memory limit in kilobytes (swap is capped to the same value)
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Number of CPUs the container may use
    #[serde(default)]
    pub cpus: Option<f64>,

    /// Maximum number of processes/threads
    #[serde(default)]
    pub max_processes: Option<u32>,

    /// Maximum captured size of each output stream in kilobytes
    #[serde(default)]
    pub max_output: Option<u64>,

    /// Maximum open files
    #[serde(default)]
    pub max_open_files: Option<u32>,
}

impl ResourceLimits {
    /// 1 kilobyte in bytes
    pub const KB: u64 = 1;
    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;
    /// 1 gigabyte in kilobytes
    pub const GB: u64 = 1024 * 1024;

    /// Wall time used when neither the config nor the request sets one.
    pub const FALLBACK_WALL_TIME: f64 = 10.0;
    /// Upper bound on any configured wall time, in seconds.
    pub const MAX_WALL_TIME: f64 = 86400.0;

    /// Create new resource limits with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits with every field unset, for use as an override layer
    pub fn unset() -> Self {
        Self {
            time_limit: None,
            wall_time_limit: None,
            memory_limit: None,
            cpus: None,
            max_processes: None,
            max_output: None,
            max_open_files: None,
        }
    }

    /// Set the CPU time limit in seconds
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the wall clock time limit in seconds
    pub fn with_wall_time_limit(mut self, seconds: f64) -> Self {
        self.wall_time_limit = Some(seconds);
        self
    }

    /// Set the memory limit in kilobytes
    pub fn with_memory_limit(mut self, kb: u64) -> Self {
        self.memory_limit = Some(kb);
        self
    }

    /// Set the CPU quota
    pub fn with_cpus(mut self, cpus: f64) -> Self {
        self.cpus = Some(cpus);
        self
    }

    /// Set the maximum number of processes
    pub fn with_max_processes(mut self, count: u32) -> Self {
        self.max_processes = Some(count);
        self
    }

    /// Set the maximum output size in kilobytes
    pub fn with_max_output(mut self, kb: u64) -> Self {
        self.max_output = Some(kb);
        self
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    ///
    /// Returns a new ResourceLimits with values from `overrides` taking precedence
    /// over values from `self` when both are present.
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            time_limit: overrides.time_limit.or(self.time_limit),
            wall_time_limit: overrides.wall_time_limit.or(self.wall_time_limit),
            memory_limit: overrides.memory_limit.or(self.memory_limit),
            cpus: overrides.cpus.or(self.cpus),
            max_processes: overrides.max_processes.or(self.max_processes),
            max_output: overrides.max_output.or(self.max_output),
            max_open_files: overrides.max_open_files.or(self.max_open_files),
        }
    }

    /// The wall clock budget for a run. Never unbounded.
    pub fn wall_time(&self) -> Duration {
        let seconds = self
            .wall_time_limit
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(Self::FALLBACK_WALL_TIME)
            .min(Self::MAX_WALL_TIME);
        Duration::from_secs_f64(seconds)
    }

    /// Output capture cap in bytes, if any
    pub fn max_output_bytes(&self) -> Option<usize> {
        self.max_output
            .map(|kb| usize::try_from(kb.saturating_mul(1024)).unwrap_or(usize::MAX))
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            time_limit: Some(5.0),
            wall_time_limit: Some(Self::FALLBACK_WALL_TIME),
            memory_limit: Some(262144), // 256 MB
            cpus: Some(1.0),
            max_processes: Some(64),
            max_output: Some(1024), // 1 MB
            max_open_files: Some(256),
        }
    }
}

/// A single fixed test case: the arguments passed to `add` and the value it
/// must return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub args: Vec<i64>,
    pub expected: i64,
}

impl TestCase {
    pub fn new(args: impl Into<Vec<i64>>, expected: i64) -> Self {
        Self {
            args: args.into(),
            expected,
        }
    }

    /// The built-in case set every language is checked against.
    pub fn defaults() -> Vec<TestCase> {
        vec![TestCase::new([5, 7], 12), TestCase::new([-5, -3], -8)]
    }
}

/// Raw result of running one generated program in the sandbox
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Exit code if the process exited normally
    pub exit_code: Option<i32>,

    /// Whether the wall time limit expired and the run was killed
    pub timed_out: bool,

    /// Failure attributable to the execution environment, not the code
    pub infrastructure_error: Option<String>,

    /// Wall clock time used, in seconds
    pub wall_time: f64,

    /// Whether either stream hit the output cap
    pub output_truncated: bool,
}

impl ExecutionOutcome {
    /// An outcome for a run that never got a usable process
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self {
            infrastructure_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Check if the program ran to completion and exited with code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.infrastructure_error.is_none() && self.exit_code == Some(0)
    }
}
