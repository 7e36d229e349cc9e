use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationReport;

/// Errors raised before generation starts: bad parameters or catalogs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration or catalogs failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(ValidationReport),
    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A catalog file is missing or malformed.
    #[error("catalog {path}: {message}")]
    Catalog { path: PathBuf, message: String },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results returned by dragonfill-core.
pub type Result<T> = std::result::Result<T, ConfigError>;
