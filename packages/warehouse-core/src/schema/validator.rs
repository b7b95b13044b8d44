//! Schema validator: diffs the expected model against a live store.
//!
//! Findings are split structurally into blocking issues and advisory
//! warnings. Each per-table check returns its own [`Findings`]; the validator
//! concatenates them, so a table whose catalog cannot be read is reported
//! as an issue without hiding findings for the other tables.

use std::collections::HashSet;

use serde::Serialize;

use super::compat::is_compatible;
use super::introspect::{ActualColumn, ActualForeignKey, Introspector};
use super::model::{IndexSpec, TableSpec, EXPECTED_INDEXES, EXPECTED_TABLES};
use crate::error::{CatalogError, CatalogResult};
use crate::store::RowQuery;

/// Kind of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingTable,
    MissingColumn,
    PrimaryKeyMismatch,
    MissingForeignKey,
    TableValidationError,
    TypeMismatch,
    ExtraColumn,
    MissingIndex,
    ForeignKeysDisabled,
    ForeignKeyCheckError,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingTable => "missing_table",
            IssueKind::MissingColumn => "missing_column",
            IssueKind::PrimaryKeyMismatch => "primary_key_mismatch",
            IssueKind::MissingForeignKey => "missing_foreign_key",
            IssueKind::TableValidationError => "table_validation_error",
            IssueKind::TypeMismatch => "type_mismatch",
            IssueKind::ExtraColumn => "extra_column",
            IssueKind::MissingIndex => "missing_index",
            IssueKind::ForeignKeysDisabled => "foreign_keys_disabled",
            IssueKind::ForeignKeyCheckError => "foreign_key_check_error",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn table(kind: IssueKind, table: &str, message: String) -> Self {
        Self {
            kind,
            table: Some(table.to_string()),
            column: None,
            message,
        }
    }

    fn column(kind: IssueKind, table: &str, column: &str, message: String) -> Self {
        Self {
            kind,
            table: Some(table.to_string()),
            column: Some(column.to_string()),
            message,
        }
    }

    fn global(kind: IssueKind, message: String) -> Self {
        Self {
            kind,
            table: None,
            column: None,
            message,
        }
    }
}

/// Blocking issues and advisory warnings produced by one check.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Findings {
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl Findings {
    fn issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    fn warning(&mut self, warning: ValidationIssue) {
        self.warnings.push(warning);
    }

    fn extend(&mut self, other: Findings) {
        self.issues.extend(other.issues);
        self.warnings.extend(other.warnings);
    }
}

/// Summary counts of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total_tables_expected: usize,
    pub total_tables_found: usize,
    pub total_tables_missing: usize,
    pub total_indexes_expected: usize,
    pub total_indexes_found: usize,
    pub total_indexes_missing: usize,
    pub total_issues: usize,
    pub total_warnings: usize,
}

/// Result of validating a store against the expected model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub tables_found: Vec<String>,
    pub tables_missing: Vec<String>,
    pub indexes_found: Vec<String>,
    pub indexes_missing: Vec<String>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Issues of the given kind.
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    /// Warnings of the given kind.
    pub fn warnings_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// Validates a store against a closed expected model.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'m> {
    tables: &'m [TableSpec],
    indexes: &'m [IndexSpec],
}

impl Default for SchemaValidator<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator<'static> {
    /// Validator for the warehouse model.
    pub fn new() -> Self {
        Self::with_model(EXPECTED_TABLES, EXPECTED_INDEXES)
    }
}

impl<'m> SchemaValidator<'m> {
    /// Validator for an arbitrary model.
    pub fn with_model(tables: &'m [TableSpec], indexes: &'m [IndexSpec]) -> Self {
        Self { tables, indexes }
    }

    /// Validates the store behind `conn`.
    ///
    /// # Returns
    /// `CatalogResult<ValidationReport>`. Only a failure to list tables or
    /// indexes aborts the run; per-table failures are folded into the report.
    pub fn validate<Q: RowQuery>(&self, conn: &Q) -> CatalogResult<ValidationReport> {
        let introspector = Introspector::new(conn);
        let existing_tables: HashSet<String> = introspector
            .tables()
            .map_err(|e| CatalogError::Schema(format!("Failed to list tables: {}", e)))?
            .into_iter()
            .collect();
        let existing_indexes: HashSet<String> = introspector
            .indexes()
            .map_err(|e| CatalogError::Schema(format!("Failed to list indexes: {}", e)))?
            .into_iter()
            .collect();

        let mut findings = Findings::default();
        let mut tables_found = Vec::new();
        let mut tables_missing = Vec::new();

        for spec in self.tables {
            if existing_tables.contains(spec.name) {
                tables_found.push(spec.name.to_string());
                tracing::debug!("Validating structure of table {}", spec.name);
                findings.extend(check_table_structure(spec, introspector.columns(spec.name)));
            } else {
                tables_missing.push(spec.name.to_string());
                findings.issue(ValidationIssue::table(
                    IssueKind::MissingTable,
                    spec.name,
                    format!("Table '{}' does not exist", spec.name),
                ));
            }
        }

        let mut indexes_found = Vec::new();
        let mut indexes_missing = Vec::new();
        for index in self.indexes {
            if existing_indexes.contains(index.name) {
                indexes_found.push(index.name.to_string());
            } else {
                indexes_missing.push(index.name.to_string());
                findings.warning(ValidationIssue::table(
                    IssueKind::MissingIndex,
                    index.table,
                    format!(
                        "Recommended index '{}' on {}({}) does not exist",
                        index.name,
                        index.table,
                        index.columns.join(", ")
                    ),
                ));
            }
        }

        findings.extend(self.check_foreign_keys(&introspector, &existing_tables));

        let summary = ValidationSummary {
            total_tables_expected: self.tables.len(),
            total_tables_found: tables_found.len(),
            total_tables_missing: tables_missing.len(),
            total_indexes_expected: self.indexes.len(),
            total_indexes_found: indexes_found.len(),
            total_indexes_missing: indexes_missing.len(),
            total_issues: findings.issues.len(),
            total_warnings: findings.warnings.len(),
        };

        let report = ValidationReport {
            is_valid: findings.issues.is_empty(),
            issues: findings.issues,
            warnings: findings.warnings,
            tables_found,
            tables_missing,
            indexes_found,
            indexes_missing,
            summary,
        };

        tracing::info!(
            "Schema validation finished: valid={}, issues={}, warnings={}",
            report.is_valid,
            report.summary.total_issues,
            report.summary.total_warnings
        );
        Ok(report)
    }

    fn check_foreign_keys<Q: RowQuery>(
        &self,
        introspector: &Introspector<'_, Q>,
        existing_tables: &HashSet<String>,
    ) -> Findings {
        let mut findings = Findings::default();

        let enabled = match introspector.foreign_keys_enabled() {
            Ok(enabled) => enabled,
            Err(e) => {
                findings.warning(ValidationIssue::global(
                    IssueKind::ForeignKeyCheckError,
                    format!("Failed to read the foreign key enforcement flag: {}", e),
                ));
                return findings;
            }
        };

        if !enabled {
            findings.warning(ValidationIssue::global(
                IssueKind::ForeignKeysDisabled,
                "Foreign key enforcement is disabled; run PRAGMA foreign_keys = ON".to_string(),
            ));
            return findings;
        }

        for spec in self.tables {
            if !existing_tables.contains(spec.name) {
                continue;
            }
            findings.extend(check_table_foreign_keys(
                spec,
                introspector.foreign_keys(spec.name),
            ));
        }
        findings
    }
}

/// Compares the columns of one table against its spec.
///
/// An introspection failure becomes a single blocking issue for the table.
pub fn check_table_structure(
    spec: &TableSpec,
    actual: CatalogResult<Vec<ActualColumn>>,
) -> Findings {
    let mut findings = Findings::default();
    let actual = match actual {
        Ok(columns) => columns,
        Err(e) => {
            tracing::warn!("Failed to read columns of {}: {}", spec.name, e);
            findings.issue(ValidationIssue::table(
                IssueKind::TableValidationError,
                spec.name,
                format!("Failed to validate table '{}': {}", spec.name, e),
            ));
            return findings;
        }
    };

    for expected in spec.columns {
        let Some(found) = actual.iter().find(|c| c.name == expected.name) else {
            findings.issue(ValidationIssue::column(
                IssueKind::MissingColumn,
                spec.name,
                expected.name,
                format!("Table '{}' has no column '{}'", spec.name, expected.name),
            ));
            continue;
        };

        if !is_compatible(expected.column_type, &found.declared_type) {
            findings.warning(ValidationIssue::column(
                IssueKind::TypeMismatch,
                spec.name,
                expected.name,
                format!(
                    "Column '{}.{}' has type '{}', expected {}",
                    spec.name,
                    expected.name,
                    found.declared_type.to_ascii_uppercase(),
                    expected.column_type
                ),
            ));
        }

        if expected.primary_key != found.primary_key {
            findings.issue(ValidationIssue::column(
                IssueKind::PrimaryKeyMismatch,
                spec.name,
                expected.name,
                format!(
                    "Column '{}.{}' primary key flag is {}, expected {}",
                    spec.name, expected.name, found.primary_key, expected.primary_key
                ),
            ));
        }
    }

    for extra in actual.iter().filter(|c| spec.column(&c.name).is_none()) {
        findings.warning(ValidationIssue::column(
            IssueKind::ExtraColumn,
            spec.name,
            &extra.name,
            format!("Table '{}' has unexpected column '{}'", spec.name, extra.name),
        ));
    }

    findings
}

/// Reports every expected foreign key of one table missing from the store.
pub fn check_table_foreign_keys(
    spec: &TableSpec,
    actual: CatalogResult<Vec<ActualForeignKey>>,
) -> Findings {
    let mut findings = Findings::default();
    let actual = match actual {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!("Failed to read foreign keys of {}: {}", spec.name, e);
            findings.issue(ValidationIssue::table(
                IssueKind::TableValidationError,
                spec.name,
                format!("Failed to read foreign keys of table '{}': {}", spec.name, e),
            ));
            return findings;
        }
    };

    for expected in spec.foreign_keys {
        let present = actual.iter().any(|fk| {
            fk.from_column == expected.from_column
                && fk.to_table == expected.to_table
                && fk.to_column == expected.to_column
        });
        if !present {
            findings.issue(ValidationIssue::column(
                IssueKind::MissingForeignKey,
                spec.name,
                expected.from_column,
                format!(
                    "Table '{}' is missing foreign key {} -> {}.{}",
                    spec.name, expected.from_column, expected.to_table, expected.to_column
                ),
            ));
        }
    }
    findings
}
