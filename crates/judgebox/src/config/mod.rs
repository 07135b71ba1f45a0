use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::language::{
    BlockComment, CommentSyntax, DEFAULT_WORKDIR, FileExtension, HarnessConfig, Language,
    RunConfig,
};
use crate::types::ResourceLimits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../judgebox.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// When the container runtime should fetch a language image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    /// Pull only if the image is not present locally
    #[default]
    Missing,
    /// Never pull; a missing image is an infrastructure error
    Never,
    /// Pull before every run
    Always,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Missing => "missing",
            PullPolicy::Never => "never",
            PullPolicy::Always => "always",
        }
    }
}

/// Config for judgebox
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the docker binary (uses PATH if not specified).
    #[serde(default)]
    pub docker_path: Option<PathBuf>,

    /// Host directory under which per-run workspaces are created.
    ///
    /// Must be visible to the Docker daemon, since each workspace is
    /// bind-mounted into its container.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Prefix for workspace directory and container names.
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,

    /// Maximum number of sandboxed runs in flight at once.
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: u32,

    /// Submissions larger than this are rejected before generation.
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,

    /// Image pull policy passed to `docker run --pull`.
    #[serde(default)]
    pub pull_policy: PullPolicy,

    /// Default resource limits applied to all executions.
    /// Overridden by per-language limits, then by per-request limits.
    #[serde(default)]
    pub default_limits: ResourceLimits,

    /// Language configurations keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            docker_path: None,
            workspace_root: default_workspace_root(),
            container_prefix: default_container_prefix(),
            max_concurrent_runs: default_max_concurrent_runs(),
            max_code_bytes: default_max_code_bytes(),
            pull_policy: PullPolicy::default(),
            default_limits: ResourceLimits::default(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by ID
    pub fn get_language(&self, id: &str) -> Result<&Language, ConfigError> {
        self.languages
            .get(id)
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Language IDs and display names, sorted by ID
    pub fn language_list(&self) -> Vec<(&str, &str)> {
        let mut languages: Vec<_> = self
            .languages
            .iter()
            .map(|(id, lang)| (id.as_str(), lang.name.as_str()))
            .collect();
        languages.sort_unstable_by_key(|(id, _)| *id);
        languages
    }

    /// Get the path to the docker binary
    pub fn docker_binary(&self) -> PathBuf {
        self.docker_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("docker"))
    }

    /// Merge resource limits: config defaults, then language, then request
    pub fn effective_limits(
        &self,
        language: &Language,
        overrides: Option<&ResourceLimits>,
    ) -> ResourceLimits {
        let mut limits = self.default_limits.clone();
        if let Some(ref lang_limits) = language.run.limits {
            limits = limits.with_overrides(lang_limits);
        }
        if let Some(user_limits) = overrides {
            limits = limits.with_overrides(user_limits);
        }
        limits
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("judgebox")
}

fn default_container_prefix() -> String {
    "judgebox".to_owned()
}

fn default_max_concurrent_runs() -> u32 {
    8
}

fn default_max_code_bytes() -> usize {
    64 * 1024
}
