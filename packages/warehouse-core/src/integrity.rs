//! Data integrity audit.
//!
//! Checks that schema constraints cannot express, or that may have been
//! bypassed while enforcement was off. Every check is read-only and runs
//! independently; a check that cannot run is recorded in
//! [`IntegrityReport::check_failures`] and the rest continue.

use std::collections::{BTreeMap, HashMap};

use rusqlite::types::Value;
use serde::Serialize;

use crate::error::CatalogResult;
use crate::schema::{TableSpec, EXPECTED_TABLES};
use crate::store::{quote_ident, RowQuery};
use crate::versions::{is_valid_commit_hash, VersionKind};

/// A stored cell, decoded without trusting the declared column type.
///
/// Column affinity does not stop a REAL or TEXT value from landing in an
/// INTEGER column, so audited cells keep whatever storage class they have.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The value if it is stored as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Integer(v) => CellValue::Integer(v),
            Value::Real(v) => CellValue::Real(v),
            Value::Text(v) => CellValue::Text(v),
            Value::Blob(v) => CellValue::Blob(v),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Real(v) => write!(f, "{}", v),
            CellValue::Text(v) => write!(f, "'{}'", v),
            CellValue::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
        }
    }
}

/// Row whose foreign key resolves to no parent row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: Option<i64>,
    pub parent_table: String,
    pub from_column: Option<String>,
}

/// Tagged segment with an invalid frame interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalViolation {
    pub tag_id: i64,
    pub video_id: CellValue,
    pub task_id: CellValue,
    pub start: CellValue,
    pub end: CellValue,
}

/// Commit hash shared by more than one version row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateHashGroup {
    pub commit_hash: String,
    pub count: i64,
    pub ids: Vec<i64>,
}

/// Version row whose commit hash is not 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedHash {
    pub id: i64,
    pub commit_hash: String,
}

/// Why an analysis-data row is inconsistent with its problem flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemFlagReason {
    /// Flag set, no problem reference
    MissingProblem,
    /// Problem reference set, flag cleared
    UnexpectedProblem,
    /// Flag is set to something other than integer 0 or 1
    InvalidFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemFlagViolation {
    pub analysis_data_id: i64,
    pub is_problem: CellValue,
    pub problem_id: CellValue,
    pub reason: ProblemFlagReason,
}

/// A check that could not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub check: String,
    pub message: String,
}

/// Findings of one audit run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub foreign_key_violations: Vec<ForeignKeyViolation>,
    pub interval_violations: Vec<IntervalViolation>,
    /// Keyed `child.column -> parent.column`
    pub orphaned_counts: BTreeMap<String, i64>,
    pub duplicate_hash_groups: BTreeMap<VersionKind, Vec<DuplicateHashGroup>>,
    pub malformed_hashes: BTreeMap<VersionKind, Vec<MalformedHash>>,
    pub problem_flag_violations: Vec<ProblemFlagViolation>,
    pub check_failures: Vec<CheckFailure>,
}

impl IntegrityReport {
    /// True when no check found anything and every check ran.
    pub fn is_clean(&self) -> bool {
        self.foreign_key_violations.is_empty()
            && self.interval_violations.is_empty()
            && self.orphaned_counts.values().all(|&count| count == 0)
            && self.duplicate_hash_groups.values().all(Vec::is_empty)
            && self.malformed_hashes.values().all(Vec::is_empty)
            && self.problem_flag_violations.is_empty()
            && self.check_failures.is_empty()
    }

    fn record<T>(&mut self, check: &str, result: CatalogResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                tracing::debug!("Integrity check {} completed", check);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Integrity check {} failed: {}", check, e);
                self.check_failures.push(CheckFailure {
                    check: check.to_string(),
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

/// Runs the integrity checks against a store.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityAuditor<'m> {
    tables: &'m [TableSpec],
}

impl Default for IntegrityAuditor<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrityAuditor<'static> {
    pub fn new() -> Self {
        Self {
            tables: EXPECTED_TABLES,
        }
    }
}

impl<'m> IntegrityAuditor<'m> {
    /// Auditor whose orphan check walks the relationships of `tables`.
    pub fn with_model(tables: &'m [TableSpec]) -> Self {
        Self { tables }
    }

    /// Runs every check. Never fails as a whole.
    pub fn audit<Q: RowQuery>(&self, conn: &Q) -> IntegrityReport {
        let mut report = IntegrityReport::default();

        if let Some(violations) = report.record("foreign_key_check", foreign_key_violations(conn)) {
            report.foreign_key_violations = violations;
        }
        if let Some(violations) = report.record("interval_validation", interval_violations(conn)) {
            report.interval_violations = violations;
        }

        for table in self.tables {
            for fk in table.foreign_keys {
                let key = format!(
                    "{}.{} -> {}.{}",
                    table.name, fk.from_column, fk.to_table, fk.to_column
                );
                let count = orphan_count(conn, table.name, fk.from_column, fk.to_table, fk.to_column);
                if let Some(count) = report.record(&format!("orphans:{key}"), count) {
                    report.orphaned_counts.insert(key, count);
                }
            }
        }

        for kind in VersionKind::ALL {
            let check = format!("duplicate_hashes:{kind}");
            if let Some(groups) = report.record(&check, duplicate_hashes(conn, kind)) {
                report.duplicate_hash_groups.insert(kind, groups);
            }
            let check = format!("malformed_hashes:{kind}");
            if let Some(rows) = report.record(&check, malformed_hashes(conn, kind)) {
                report.malformed_hashes.insert(kind, rows);
            }
        }

        if let Some(violations) = report.record("problem_flag", problem_flag_violations(conn)) {
            report.problem_flag_violations = violations;
        }

        tracing::info!(
            "Integrity audit finished: clean={}, failed checks={}",
            report.is_clean(),
            report.check_failures.len()
        );
        report
    }
}

/// Enumerates foreign key violations regardless of the enforcement flag.
fn foreign_key_violations<Q: RowQuery>(conn: &Q) -> CatalogResult<Vec<ForeignKeyViolation>> {
    let raw: Vec<(String, Option<i64>, String, i64)> = conn.query_rows(
        "PRAGMA foreign_key_check",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    // fkid indexes into pragma_foreign_key_list of the child table.
    let mut fk_columns: HashMap<String, HashMap<i64, String>> = HashMap::new();
    let mut out = Vec::with_capacity(raw.len());
    for (table, rowid, parent_table, fkid) in raw {
        if !fk_columns.contains_key(&table) {
            let ids: Vec<(i64, String)> = conn.query_rows(
                "SELECT id, \"from\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
                [table.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let mut by_id: HashMap<i64, String> = HashMap::new();
            for (id, from) in ids {
                match by_id.get_mut(&id) {
                    Some(cols) => {
                        cols.push(',');
                        cols.push_str(&from);
                    }
                    None => {
                        by_id.insert(id, from);
                    }
                }
            }
            fk_columns.insert(table.clone(), by_id);
        }
        let from_column = fk_columns.get(&table).and_then(|m| m.get(&fkid)).cloned();
        out.push(ForeignKeyViolation {
            table,
            rowid,
            parent_table,
            from_column,
        });
    }
    Ok(out)
}

fn interval_violations<Q: RowQuery>(conn: &Q) -> CatalogResult<Vec<IntervalViolation>> {
    conn.query_rows(
        "SELECT tag_ID, video_ID, task_ID, start, \"end\" FROM tag_table
         WHERE start >= \"end\" OR start < 0
         ORDER BY tag_ID",
        [],
        |row| {
            Ok(IntervalViolation {
                tag_id: row.get(0)?,
                video_id: row.get::<_, Value>(1)?.into(),
                task_id: row.get::<_, Value>(2)?.into(),
                start: row.get::<_, Value>(3)?.into(),
                end: row.get::<_, Value>(4)?.into(),
            })
        },
    )
}

fn orphan_count<Q: RowQuery>(
    conn: &Q,
    child: &str,
    column: &str,
    parent: &str,
    parent_column: &str,
) -> CatalogResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {child} AS c
         WHERE c.{col} IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM {parent} AS p WHERE p.{pcol} = c.{col})",
        child = quote_ident(child),
        col = quote_ident(column),
        parent = quote_ident(parent),
        pcol = quote_ident(parent_column),
    );
    conn.query_scalar(&sql, [])
}

fn duplicate_hashes<Q: RowQuery>(conn: &Q, kind: VersionKind) -> CatalogResult<Vec<DuplicateHashGroup>> {
    let c = kind.columns();
    let groups: Vec<(String, i64)> = conn.query_rows(
        &format!(
            "SELECT CAST({hash} AS TEXT) AS h, COUNT(*) FROM {table}
             WHERE {hash} IS NOT NULL
             GROUP BY h HAVING COUNT(*) > 1
             ORDER BY h",
            hash = c.commit_hash,
            table = c.table
        ),
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let ids_sql = format!(
        "SELECT {id} FROM {table} WHERE CAST({hash} AS TEXT) = ?1 ORDER BY {id}",
        id = c.id,
        table = c.table,
        hash = c.commit_hash
    );
    let mut out = Vec::with_capacity(groups.len());
    for (commit_hash, count) in groups {
        let ids = conn.query_rows(&ids_sql, [commit_hash.as_str()], |row| row.get(0))?;
        out.push(DuplicateHashGroup {
            commit_hash,
            count,
            ids,
        });
    }
    Ok(out)
}

fn malformed_hashes<Q: RowQuery>(conn: &Q, kind: VersionKind) -> CatalogResult<Vec<MalformedHash>> {
    let c = kind.columns();
    let rows: Vec<(i64, String)> = conn.query_rows(
        &format!(
            "SELECT {id}, CAST({hash} AS TEXT) FROM {table} WHERE {hash} IS NOT NULL ORDER BY {id}",
            id = c.id,
            hash = c.commit_hash,
            table = c.table
        ),
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(rows
        .into_iter()
        .filter(|(_, hash)| !is_valid_commit_hash(hash))
        .map(|(id, commit_hash)| MalformedHash { id, commit_hash })
        .collect())
}

fn problem_flag_violations<Q: RowQuery>(conn: &Q) -> CatalogResult<Vec<ProblemFlagViolation>> {
    let rows: Vec<(i64, CellValue, CellValue)> = conn.query_rows(
        "SELECT analysis_data_ID, analysis_data_isproblem, problem_ID
         FROM analysis_data_table
         ORDER BY analysis_data_ID",
        [],
        |row| {
            Ok((
                row.get(0)?,
                row.get::<_, Value>(1)?.into(),
                row.get::<_, Value>(2)?.into(),
            ))
        },
    )?;

    Ok(rows
        .into_iter()
        .filter_map(|(analysis_data_id, is_problem, problem_id)| {
            let reason = match (&is_problem, problem_id.is_null()) {
                (CellValue::Integer(1), true) => ProblemFlagReason::MissingProblem,
                (CellValue::Integer(0) | CellValue::Null, false) => {
                    ProblemFlagReason::UnexpectedProblem
                }
                (CellValue::Integer(0 | 1) | CellValue::Null, _) => return None,
                _ => ProblemFlagReason::InvalidFlag,
            };
            Some(ProblemFlagViolation {
                analysis_data_id,
                is_problem,
                problem_id,
                reason,
            })
        })
        .collect())
}
