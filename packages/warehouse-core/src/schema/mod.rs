//! Schema validation subsystem.
//!
//! Compares a live store against the closed expected model:
//! - Missing tables, columns, primary keys and foreign keys are blocking
//! - Type drift, extra columns, missing indexes and disabled enforcement are advisory
//! - Not-null flags are declared but not compared

mod compat;
mod introspect;
mod model;
mod report;
mod validator;

pub use compat::{is_compatible, TypeCategory};
pub use introspect::{ActualColumn, ActualForeignKey, Introspector};
pub use model::{
    expected_table, ColumnSpec, ColumnType, ForeignKeySpec, IndexSpec, TableSpec,
    EXPECTED_INDEXES, EXPECTED_TABLES, SCHEMA_SQL,
};
pub use report::render_report;
pub use validator::{
    check_table_foreign_keys, check_table_structure, Findings, IssueKind, SchemaValidator,
    ValidationIssue, ValidationReport, ValidationSummary,
};
