//! Core contracts shared by the dragonfill crates.
//!
//! This crate defines the business configuration and its validation, the
//! reference catalogs, the physical layout of the generated tables and the
//! typed values stored in them.

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod schema;
pub mod types;
pub mod validation;

pub use catalog::{
    CityEntry, DomainEntry, GameEntry, NameEntry, ReferenceCatalogs, TournamentPairing,
    TournamentTypeEntry, bundled_catalog_dir,
};
pub use config::{
    BoundedNormal, BusinessConfig, CustomerConfig, ExpenseParams, GammaParams, HolidayCalendar,
    InventoryConfig, MaintenanceConfig, PiecesProbability, RelationshipConfig, RentalConfig,
    ShopConfig, ShopHours, StaffConfig, TournamentConfig, TrafficConfig, UnmatchedRentalPolicy,
};
pub use dataset::{Dataset, Row, Table};
pub use error::{ConfigError, Result};
pub use graph::{FkGraphReport, FkGraphSummary, build_fk_graph_report, dataset_table_order};
pub use schema::{ColumnDef, ColumnKind, ForeignKeyDef, TableName, TableSchema};
pub use types::{DATE_FORMAT, Destination, Gender, Money, TIMESTAMP_FORMAT, Value};
pub use validation::{
    IssueSeverity, ValidationIssue, ValidationReport, validate_catalogs, validate_config,
};

/// Version of the generated table layout.
pub const DATASET_VERSION: &str = "0.1";
