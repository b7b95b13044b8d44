//! Read-only catalog introspection of a live store.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CatalogResult;
use crate::store::{quote_ident, RowQuery};

/// Column as declared in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActualColumn {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// Foreign key as declared in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ActualForeignKey {
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Catalog reader over any [`RowQuery`] implementation.
pub struct Introspector<'a, Q: RowQuery> {
    conn: &'a Q,
}

impl<'a, Q: RowQuery> Introspector<'a, Q> {
    pub fn new(conn: &'a Q) -> Self {
        Self { conn }
    }

    /// User table names, sorted, excluding `sqlite_*` internals.
    pub fn tables(&self) -> CatalogResult<Vec<String>> {
        self.conn.query_rows(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
            [],
            |row| row.get(0),
        )
    }

    /// User index names, sorted, excluding automatic indexes.
    pub fn indexes(&self) -> CatalogResult<Vec<String>> {
        self.conn.query_rows(
            "SELECT name FROM sqlite_master
             WHERE type = 'index' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
            [],
            |row| row.get(0),
        )
    }

    /// Columns of `table` in declaration order.
    pub fn columns(&self, table: &str) -> CatalogResult<Vec<ActualColumn>> {
        self.conn.query_rows(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
            [table],
            |row| {
                Ok(ActualColumn {
                    name: row.get(0)?,
                    declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(2)? != 0,
                    primary_key: row.get::<_, i64>(3)? != 0,
                })
            },
        )
    }

    /// Declared foreign keys of `table`.
    ///
    /// A reference without an explicit target column resolves to the parent's
    /// primary key, as SQLite itself does.
    pub fn foreign_keys(&self, table: &str) -> CatalogResult<Vec<ActualForeignKey>> {
        let raw: Vec<(String, String, Option<String>)> = self.conn.query_rows(
            "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
            [table],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut out = Vec::with_capacity(raw.len());
        for (from_column, to_table, to_column) in raw {
            let to_column = match to_column {
                Some(column) => column,
                None => self.primary_key_column(&to_table)?.unwrap_or_default(),
            };
            out.push(ActualForeignKey {
                from_column,
                to_table,
                to_column,
            });
        }
        Ok(out)
    }

    /// Foreign-key enforcement flag of the current connection.
    pub fn foreign_keys_enabled(&self) -> CatalogResult<bool> {
        Ok(self.conn.query_scalar("PRAGMA foreign_keys", [])? != 0)
    }

    /// Row count of every user table.
    pub fn row_counts(&self) -> CatalogResult<BTreeMap<String, i64>> {
        let mut counts = BTreeMap::new();
        for table in self.tables()? {
            let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&table));
            let count = self.conn.query_scalar(&sql, [])?;
            counts.insert(table, count);
        }
        Ok(counts)
    }

    fn primary_key_column(&self, table: &str) -> CatalogResult<Option<String>> {
        let keys: Vec<String> = self
            .columns(table)?
            .into_iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect();
        Ok(match keys.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        })
    }
}
