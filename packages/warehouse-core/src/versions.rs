//! Version lineage of library and algorithm builds.
//!
//! Each version row may name a base version in the same table. Following
//! those links from a starting row reconstructs the build lineage.

use std::collections::HashSet;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};
use crate::store::RowQuery;

/// Length of a commit hash in hex characters.
pub const COMMIT_HASH_LEN: usize = 40;

/// Versioned build entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    /// Processing library (`core_lib_table`)
    Library,
    /// Algorithm (`algorithm_table`)
    Algorithm,
}

/// Table and column names backing a [`VersionKind`].
#[derive(Debug, Clone, Copy)]
pub struct VersionColumns {
    pub table: &'static str,
    pub id: &'static str,
    pub version: &'static str,
    pub update_info: &'static str,
    pub base_version_id: &'static str,
    pub commit_hash: &'static str,
}

impl VersionKind {
    pub const ALL: [VersionKind; 2] = [VersionKind::Library, VersionKind::Algorithm];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionKind::Library => "library",
            VersionKind::Algorithm => "algorithm",
        }
    }

    pub fn columns(&self) -> VersionColumns {
        match self {
            VersionKind::Library => VersionColumns {
                table: "core_lib_table",
                id: "core_lib_ID",
                version: "core_lib_version",
                update_info: "core_lib_update_information",
                base_version_id: "core_lib_base_version_ID",
                commit_hash: "core_lib_commit_hash",
            },
            VersionKind::Algorithm => VersionColumns {
                table: "algorithm_table",
                id: "algorithm_ID",
                version: "algorithm_version",
                update_info: "algorithm_update_information",
                base_version_id: "algorithm_base_version_ID",
                commit_hash: "algorithm_commit_hash",
            },
        }
    }

    fn select_by_id(&self) -> String {
        let c = self.columns();
        format!(
            "SELECT {}, {}, {}, {}, {} FROM {} WHERE {} = ?1",
            c.id, c.version, c.update_info, c.base_version_id, c.commit_hash, c.table, c.id
        )
    }
}

impl std::fmt::Display for VersionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "library" | "core_lib" | "core_lib_table" => Ok(VersionKind::Library),
            "algorithm" | "algorithm_table" => Ok(VersionKind::Algorithm),
            other => Err(CatalogError::validation(
                "entity_kind",
                other,
                "expected 'library' or 'algorithm'",
            )),
        }
    }
}

/// A library or algorithm build row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    pub id: i64,
    pub version: Option<String>,
    pub update_info: Option<String>,
    pub base_version_id: Option<i64>,
    pub commit_hash: Option<String>,
}

/// Fetches one version row.
///
/// # Returns
/// `CatalogResult<VersionRecord>`, failing with `CatalogError::NotFound`
/// when no row has `id`.
pub fn get_version<Q: RowQuery>(conn: &Q, kind: VersionKind, id: i64) -> CatalogResult<VersionRecord> {
    fetch(conn, kind, id)?.ok_or_else(|| CatalogError::NotFound {
        table: kind.columns().table.to_string(),
        record_id: id,
    })
}

/// Lineage of `start_id`, oldest first.
///
/// A missing start row yields an empty history. A base reference to a
/// missing row ends the chain. Revisiting an id fails with
/// `CatalogError::Constraint` instead of looping.
pub fn version_history<Q: RowQuery>(
    conn: &Q,
    kind: VersionKind,
    start_id: i64,
) -> CatalogResult<Vec<VersionRecord>> {
    let mut history = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(start_id);

    while let Some(id) = current {
        if !visited.insert(id) {
            let table = kind.columns().table;
            tracing::warn!("Base version cycle in {} at id {}", table, id);
            return Err(CatalogError::Constraint {
                table: table.to_string(),
                constraint: "base_version_chain".to_string(),
                message: format!("base version chain starting at {} revisits id {}", start_id, id),
            });
        }
        let Some(record) = fetch(conn, kind, id)? else {
            break;
        };
        current = record.base_version_id;
        history.push(record);
    }

    history.reverse();
    tracing::debug!("Resolved {} {} versions from id {}", history.len(), kind, start_id);
    Ok(history)
}

fn fetch<Q: RowQuery>(conn: &Q, kind: VersionKind, id: i64) -> CatalogResult<Option<VersionRecord>> {
    conn.query_optional(&kind.select_by_id(), [id], |row| {
        Ok(VersionRecord {
            id: row.get(0)?,
            version: row.get(1)?,
            update_info: row.get(2)?,
            base_version_id: row.get(3)?,
            commit_hash: row.get(4)?,
        })
    })
}

/// Whether `hash` is exactly 40 lowercase hex characters.
pub fn is_valid_commit_hash(hash: &str) -> bool {
    hash.len() == COMMIT_HASH_LEN
        && hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Rejects malformed commit hashes before any write is attempted.
pub fn validate_commit_hash(hash: &str) -> CatalogResult<()> {
    if is_valid_commit_hash(hash) {
        Ok(())
    } else {
        Err(CatalogError::validation(
            "commit_hash",
            hash,
            "expected 40 lowercase hexadecimal characters",
        ))
    }
}
