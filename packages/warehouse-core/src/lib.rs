//! Schema and integrity validation for the video evaluation data warehouse.
//!
//! Provides the expected schema model, catalog introspection, schema
//! validation with report rendering, version lineage resolution and a
//! data integrity audit over a SQLite store.

pub mod api;
pub mod config;
pub mod error;
pub mod integrity;
pub mod schema;
pub mod store;
pub mod versions;

pub use api::{
    check_data_integrity, check_database_compatibility, get_schema_validation_report,
    get_version_history, validate_database_schema,
};
pub use error::{CatalogError, CatalogResult};
