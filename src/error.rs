//! Error kinds shared across the crate.

use thiserror::Error;

/// Failure modes surfaced by the schema model, diff engine, emitter,
/// introspector, and migration runner.
#[derive(Debug, Error)]
pub enum GormiteError {
    #[error("duplicate name: {kind} `{name}` already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("not found: {kind} `{name}`")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("could not parse introspection result: {0}")]
    IntrospectionParseError(String),

    #[error("unsupported: {0}")]
    UnsupportedFeature(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] tokio_postgres::Error),
}

/// Failure modes specific to loading and validating `gormite.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, GormiteError>;
