//! Configuration file parsing.
//!
//! Reads `gormite.yaml`: database DSN, output tool/migrations directory,
//! and schema defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub schema: SchemaConfigSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Connection string passed to `tokio-postgres`. Overridable by `--dsn`.
    pub dsn: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Target migration runner: "migrate" or "goose".
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Directory migration files are written to.
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            migrations_dir: default_migrations_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaConfigSection {
    #[serde(default = "default_schema_name")]
    pub default_schema: String,

    #[serde(default = "default_max_identifier_length")]
    pub max_identifier_length: usize,
}

impl Default for SchemaConfigSection {
    fn default() -> Self {
        Self {
            default_schema: default_schema_name(),
            max_identifier_length: default_max_identifier_length(),
        }
    }
}

fn default_tool() -> String {
    "migrate".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_schema_name() -> String {
    "public".to_string()
}

fn default_max_identifier_length() -> usize {
    63
}

impl Config {
    /// Load configuration from `gormite.yaml` (or whatever path is given).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values that `serde` can't enforce structurally.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.dsn.trim().is_empty() {
            return Err(ConfigError::Invalid("database.dsn must not be empty".to_string()));
        }
        if !matches!(self.output.tool.as_str(), "migrate" | "goose") {
            return Err(ConfigError::Invalid(format!(
                "invalid output.tool '{}': expected 'migrate' or 'goose'",
                self.output.tool
            )));
        }
        if self.schema.max_identifier_length == 0 {
            return Err(ConfigError::Invalid(
                "schema.max_identifier_length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and_validate(yaml: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: "<test>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn minimal_config_applies_defaults() {
        let config = parse_and_validate("database:\n  dsn: postgres://localhost/app\n").unwrap();
        assert_eq!(config.output.tool, "migrate");
        assert_eq!(config.schema.default_schema, "public");
        assert_eq!(config.schema.max_identifier_length, 63);
    }

    #[test]
    fn empty_dsn_is_rejected() {
        let err = parse_and_validate("database:\n  dsn: \"\"\n").unwrap_err();
        assert!(err.to_string().contains("dsn"));
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let yaml = "database:\n  dsn: postgres://localhost/app\noutput:\n  tool: liquibase\n";
        let err = parse_and_validate(yaml).unwrap_err();
        assert!(err.to_string().contains("invalid output.tool"));
    }

    #[test]
    fn goose_tool_is_accepted() {
        let yaml = "database:\n  dsn: postgres://localhost/app\noutput:\n  tool: goose\n";
        assert!(parse_and_validate(yaml).is_ok());
    }
}
