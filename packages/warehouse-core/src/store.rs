//! Connection handling and the row-query capability.
//!
//! A [`Store`] owns one SQLite connection for the duration of a call and
//! releases it on drop. Readers go through [`RowQuery`]; writers go through
//! [`Store::transaction`], which commits on success and rolls back otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Params, Row, Transaction};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};

/// Generic read access used by the introspector, validator and auditor.
pub trait RowQuery {
    /// Runs `sql` and maps every returned row.
    fn query_rows<T, P, F>(&self, sql: &str, params: P, map: F) -> CatalogResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>;

    /// Runs `sql` and maps the first row, if any.
    fn query_optional<T, P, F>(&self, sql: &str, params: P, map: F) -> CatalogResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>;

    /// Runs `sql` and returns the first column of the first row.
    fn query_scalar<P: Params>(&self, sql: &str, params: P) -> CatalogResult<i64> {
        self.query_optional(sql, params, |row| row.get::<_, Option<i64>>(0))
            .map(|value| value.flatten().unwrap_or(0))
    }
}

impl RowQuery for Connection {
    fn query_rows<T, P, F>(&self, sql: &str, params: P, map: F) -> CatalogResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn query_optional<T, P, F>(&self, sql: &str, params: P, map: F) -> CatalogResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        Ok(self.query_row(sql, params, map).optional()?)
    }
}

/// An open connection to a warehouse store.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Opens an existing store.
    ///
    /// # Arguments
    /// * `config` - Connection configuration; `db_path` must already exist
    ///
    /// # Returns
    /// `CatalogResult<Store>`, failing with `CatalogError::Connection` when
    /// the file is missing or is not a SQLite database.
    pub fn open(config: &CatalogConfig) -> CatalogResult<Self> {
        let path = config.db_path.clone();
        if !path.exists() {
            return Err(CatalogError::Connection {
                path,
                message: "database file not found".to_string(),
            });
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags).map_err(|e| connection_error(&path, e))?;
        Self::configure(conn, path, config)
    }

    /// Creates the store file (and its parent directories) if missing, then opens it.
    pub fn create(config: &CatalogConfig) -> CatalogResult<Self> {
        let path = config.db_path.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::Connection {
                path: path.clone(),
                message: format!("failed to create parent directory: {}", e),
            })?;
        }
        let conn = Connection::open(&path).map_err(|e| connection_error(&path, e))?;
        Self::configure(conn, path, config)
    }

    /// Opens a private in-memory store.
    pub fn in_memory(config: &CatalogConfig) -> CatalogResult<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| connection_error(&path, e))?;
        Self::configure(conn, path, config)
    }

    fn configure(conn: Connection, path: PathBuf, config: &CatalogConfig) -> CatalogResult<Self> {
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| connection_error(&path, e))?;
        let pragma = if config.enforce_foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        };
        conn.execute_batch(pragma)
            .map_err(|e| connection_error(&path, e))?;

        // A non-database file opens lazily; the first catalog read rejects it.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| connection_error(&path, e))?;

        tracing::debug!("Opened store {}", path.display());
        Ok(Self { conn, path })
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns the path this store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn transaction<T, F>(&mut self, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CatalogResult<T>,
    {
        let tx = self.conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                // Dropping the transaction would roll back as well; make it explicit.
                if let Err(rollback) = tx.rollback() {
                    tracing::error!("Rollback failed on {}: {}", self.path.display(), rollback);
                }
                Err(e)
            }
        }
    }

    /// Executes a schema definition script in one transaction.
    pub fn apply_schema(&mut self, sql: &str) -> CatalogResult<()> {
        self.transaction(|tx| {
            tx.execute_batch(sql)
                .map_err(|e| CatalogError::Schema(format!("Failed to apply schema: {}", e)))
        })
    }
}

impl RowQuery for Store {
    fn query_rows<T, P, F>(&self, sql: &str, params: P, map: F) -> CatalogResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn.query_rows(sql, params, map)
    }

    fn query_optional<T, P, F>(&self, sql: &str, params: P, map: F) -> CatalogResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn.query_optional(sql, params, map)
    }
}

fn connection_error(path: &Path, err: rusqlite::Error) -> CatalogError {
    CatalogError::Connection {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Quotes an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
