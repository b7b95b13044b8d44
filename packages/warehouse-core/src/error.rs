//! Warehouse error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised by the store layer, the validator and the auditor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Store file missing, unreadable, or not a database
    #[error("Failed to connect to database '{}': {message}", path.display())]
    Connection { path: PathBuf, message: String },

    /// A write violated a declared constraint
    #[error("Constraint '{constraint}' violated on table '{table}': {message}")]
    Constraint {
        table: String,
        constraint: String,
        message: String,
    },

    /// Lookup yielded no row
    #[error("Record {record_id} not found in table '{table}'")]
    NotFound { table: String, record_id: i64 },

    /// Caller-supplied value failed a business rule
    #[error("Invalid value '{value}' for '{field}': {message}")]
    Validation {
        field: String,
        value: String,
        message: String,
    },

    /// The validation process itself failed
    #[error("Schema error: {0}")]
    Schema(String),
}

impl CatalogError {
    /// Short stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Constraint { .. } => "E001",
            CatalogError::NotFound { .. } => "E003",
            CatalogError::Validation { .. } => "E004",
            CatalogError::Connection { .. } => "E005",
            CatalogError::Schema(_) => "E006",
        }
    }

    pub(crate) fn validation(
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CatalogError::Validation {
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Classifies a failed write on `table` into a typed constraint error.
    ///
    /// SQLite reports every constraint failure under one extended code family,
    /// so the constraint name is recovered from the message text.
    pub fn from_write(table: &str, err: rusqlite::Error) -> Self {
        let message = err.to_string();
        let is_constraint = matches!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
        if !is_constraint {
            return CatalogError::Schema(format!("Write to '{}' failed: {}", table, message));
        }

        let constraint = if message.contains("UNIQUE constraint failed") {
            "UNIQUE"
        } else if message.contains("FOREIGN KEY constraint failed") {
            "FOREIGN KEY"
        } else if message.contains("CHECK constraint failed") {
            "CHECK"
        } else if message.contains("NOT NULL constraint failed") {
            "NOT NULL"
        } else {
            "UNKNOWN"
        };

        CatalogError::Constraint {
            table: table.to_string(),
            constraint: constraint.to_string(),
            message,
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::Schema(err.to_string())
    }
}
