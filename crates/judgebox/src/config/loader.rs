//! Configuration file loading for judgebox
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::ReadFile {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_runs == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_runs must be at least 1".to_owned(),
            ));
        }
        if !is_container_name(&self.container_prefix) {
            return Err(ConfigError::Invalid(format!(
                "container_prefix '{}' must start with a letter or digit and contain only [a-zA-Z0-9_.-]",
                self.container_prefix
            )));
        }

        // Template slots are checked during deserialization
        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if lang.image.is_empty() || lang.image.starts_with('-') {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has invalid image '{}'",
                    lang.image
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if !lang.run.workdir.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' workdir must be an absolute path"
                )));
            }
            if let Some(ref name) = lang.source_name
                && (name.is_empty() || name.contains('/') || name.contains(".."))
            {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has invalid source_name '{name}'"
                )));
            }
        }

        Ok(())
    }
}

fn is_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => chars
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')),
        _ => false,
    }
}
