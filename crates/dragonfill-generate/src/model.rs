use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use dragonfill_core::TableName;

/// Options for the generation engine, separate from business parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Directory where run artifacts are written.
    pub out_dir: PathBuf,
    /// Seed of every random stream in the run.
    pub seed: u64,
    /// Run the dataset checks after assembly.
    pub verify: bool,
    /// Attempts per unique phone or e-mail draw.
    pub max_unique_attempts: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            seed: 42,
            verify: true,
            max_unique_attempts: 1000,
        }
    }
}

/// Summary of a generated table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: TableName,
    pub rows: u64,
    #[serde(default)]
    pub bytes_written: u64,
}

/// Structured generation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

/// Report for a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub tables: Vec<TableReport>,
    /// Sale pieces wanted before any stock had been delivered.
    pub dropped_sales: u64,
    /// Rental visits that found no free copy.
    pub dropped_rental_visits: u64,
    pub open_rentals: u64,
    pub bytes_written: u64,
    pub duration_ms: u64,
    pub warnings: Vec<GenerationIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<GenerationIssue>,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            ..Self::default()
        }
    }

    pub fn record_warning(
        &mut self,
        code: &str,
        message: impl Into<String>,
        table: Option<TableName>,
    ) {
        self.warnings.push(GenerationIssue {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            table: table.map(|table| table.to_string()),
        });
    }

    pub fn record_failure(&mut self, code: &str, message: impl Into<String>) {
        self.failure = Some(GenerationIssue {
            level: "error".to_string(),
            code: code.to_string(),
            message: message.into(),
            table: None,
        });
    }

    pub fn rows(&self, table: TableName) -> Option<u64> {
        self.tables
            .iter()
            .find(|report| report.table == table)
            .map(|report| report.rows)
    }
}
