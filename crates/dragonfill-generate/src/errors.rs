use thiserror::Error;

use dragonfill_core::{ConfigError, TableName};

/// Errors emitted by the generation pipeline. Any of them aborts the run.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Configuration or catalogs were rejected before generation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A generator could not satisfy a structural invariant.
    #[error("generation invariant violated: {0}")]
    Invariant(String),
    /// A natural key or foreign key has no matching row.
    #[error("referential integrity violated in {table}.{column}: {message}")]
    ReferentialIntegrity {
        table: TableName,
        column: String,
        message: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub fn invariant(message: impl Into<String>) -> Self {
        GenerationError::Invariant(message.into())
    }

    pub fn integrity(table: TableName, column: &str, message: impl Into<String>) -> Self {
        GenerationError::ReferentialIntegrity {
            table,
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// Stable code used in reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Config(_) => "config_error",
            GenerationError::Invariant(_) => "generation_invariant_error",
            GenerationError::ReferentialIntegrity { .. } => "referential_integrity_error",
            GenerationError::Io(_) | GenerationError::Json(_) | GenerationError::Csv(_) => {
                "output_error"
            }
        }
    }
}
