//! Deterministic generation of the dragonfill shop dataset.
//!
//! Records are drawn stage by stage with natural keys, projected into a
//! ledger, then resolved into the 19 relational tables and written as CSV.

pub mod calendar;
pub mod checks;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod holidays;
pub mod ledger;
pub mod model;
pub mod output;
pub mod people;
pub mod popularity;
pub mod resolve;
pub mod sampling;
pub mod unique;

pub use checks::{DatasetIssue, check_dataset};
pub use engine::{GeneratedDataset, GenerationEngine, GenerationResult, run_dir_name};
pub use errors::GenerationError;
pub use model::{GenerateOptions, GenerationIssue, GenerationReport, TableReport};
