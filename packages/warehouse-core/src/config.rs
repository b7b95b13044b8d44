//! Store connection configuration.

use std::path::{Path, PathBuf};

/// Connection configuration for the warehouse store.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Path of the SQLite database file
    pub db_path: PathBuf,
    /// Enable `PRAGMA foreign_keys` on every connection
    pub enforce_foreign_keys: bool,
    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("database.db"),
            enforce_foreign_keys: true,
            busy_timeout_ms: 5000, // 5 seconds default
        }
    }
}

impl CatalogConfig {
    /// Default configuration pointing at `path`.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self {
            db_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}
