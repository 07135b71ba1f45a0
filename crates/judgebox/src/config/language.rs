use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::harness::{CaseTemplate, HarnessTemplate};
use crate::types::ResourceLimits;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "Python 3.12")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Container image the harness runs in (e.g., "python:3.12")
    pub image: String,

    /// File name the generated program is written as.
    /// Defaults to `main.<extension>`.
    #[serde(default)]
    pub source_name: Option<String>,

    /// How user code is wrapped into a runnable program
    pub harness: HarnessConfig,

    /// Execution configuration
    pub run: RunConfig,
}

impl Language {
    /// Get the source file name for this language
    pub fn source_name(&self) -> String {
        match self.source_name {
            Some(ref name) => name.clone(),
            None => format!("main.{}", self.extension),
        }
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], source: &str, workdir: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{workdir}", workdir)
            })
            .collect()
    }

    /// The run command with placeholders resolved for this language
    pub fn run_command(&self) -> Vec<String> {
        Self::expand_command(&self.run.command, &self.source_name(), &self.run.workdir)
    }
}

/// File extension without dot (e.g., "py")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a language's harness program is assembled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Program text with `{{code}}` and `{{cases}}` slots
    pub template: HarnessTemplate,

    /// Literal for one test case with `{{args}}` and `{{expected}}` slots
    pub case: CaseTemplate,

    /// Text placed between rendered cases
    #[serde(default = "default_case_separator")]
    pub case_separator: String,

    /// Comment syntax, used to skip comments in the pre-execution check
    #[serde(default)]
    pub comments: CommentSyntax,

    /// Reject code with unbalanced delimiters before running it
    #[serde(default = "default_check_syntax")]
    pub check_syntax: bool,
}

/// Comment markers for a language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentSyntax {
    /// Line comment prefix (e.g., "#" or "//")
    #[serde(default)]
    pub line: Option<String>,

    /// Block comment delimiters
    #[serde(default)]
    pub block: Option<BlockComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockComment {
    pub open: String,
    pub close: String,
}

/// Default working directory (and workspace mount point) inside the container
pub const DEFAULT_WORKDIR: &str = "/code";

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {workdir}
    pub command: Vec<String>,

    /// Where the workspace is mounted inside the container
    #[serde(default = "default_workdir")]
    pub workdir: String,

    /// Environment Variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Allow network access (disabled by default)
    #[serde(default)]
    pub network: bool,

    /// Mount the workspace read-write (read-only by default)
    #[serde(default)]
    pub writable_workspace: bool,

    /// User to run as inside the container (image default if unset)
    #[serde(default)]
    pub user: Option<String>,

    /// Resource limits for execution (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

fn default_case_separator() -> String {
    ", ".to_owned()
}

fn default_check_syntax() -> bool {
    true
}

fn default_workdir() -> String {
    DEFAULT_WORKDIR.to_owned()
}
