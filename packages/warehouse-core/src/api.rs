//! Path-based entry points.
//!
//! Each call opens the store, runs read-only queries and releases the
//! connection before returning.

use std::path::Path;

use crate::config::CatalogConfig;
use crate::error::CatalogResult;
use crate::integrity::{IntegrityAuditor, IntegrityReport};
use crate::schema::{render_report, SchemaValidator, ValidationReport};
use crate::store::Store;
use crate::versions::{version_history, VersionKind, VersionRecord};

/// Validates the store at `path` against the expected model.
pub fn validate_database_schema(path: impl AsRef<Path>) -> CatalogResult<ValidationReport> {
    validate_with_config(&CatalogConfig::for_path(path))
}

/// Validates the store described by `config`.
pub fn validate_with_config(config: &CatalogConfig) -> CatalogResult<ValidationReport> {
    let store = Store::open(config)?;
    SchemaValidator::new().validate(&store)
}

/// Validates the store at `path` and renders the report as text.
pub fn get_schema_validation_report(path: impl AsRef<Path>) -> CatalogResult<String> {
    let path = path.as_ref();
    let report = validate_database_schema(path)?;
    Ok(render_report(&report, &path.display().to_string()))
}

/// True iff the store at `path` opens and validates without blocking issues.
pub fn check_database_compatibility(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match validate_database_schema(path) {
        Ok(report) => report.is_valid,
        Err(e) => {
            tracing::warn!("Compatibility check of {} failed: {}", path.display(), e);
            false
        }
    }
}

/// Runs the integrity audit against the store at `path`.
pub fn check_data_integrity(path: impl AsRef<Path>) -> CatalogResult<IntegrityReport> {
    audit_with_config(&CatalogConfig::for_path(path))
}

/// Runs the integrity audit against the store described by `config`.
pub fn audit_with_config(config: &CatalogConfig) -> CatalogResult<IntegrityReport> {
    let store = Store::open(config)?;
    Ok(IntegrityAuditor::new().audit(&store))
}

/// Lineage of a library or algorithm build, oldest first.
///
/// `entity_kind` must name a version table (`library` or `algorithm`).
pub fn get_version_history(
    entity_kind: &str,
    id: i64,
    path: impl AsRef<Path>,
) -> CatalogResult<Vec<VersionRecord>> {
    let kind: VersionKind = entity_kind.parse()?;
    let store = Store::open(&CatalogConfig::for_path(path))?;
    version_history(&store, kind, id)
}
