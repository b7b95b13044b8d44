//! Integrity audit against seeded stores.

use ntest::timeout;
use rusqlite::params;
use warehouse_core::config::CatalogConfig;
use warehouse_core::integrity::{CellValue, IntegrityAuditor, ProblemFlagReason};
use warehouse_core::schema::EXPECTED_TABLES;
use warehouse_core::store::Store;
use warehouse_core::versions::VersionKind;

use super::helpers::{
    exec, insert_algorithm, insert_library, insert_tag, schema_store, schema_with,
    seed_video_and_task, store_with, unenforced_store, HASH_A, HASH_B, HASH_C,
};

fn insert_analysis_data(store: &Store, is_problem: Option<i64>, problem_id: Option<i64>) -> i64 {
    let conn = store.connection();
    conn.execute(
        "INSERT INTO analysis_data_table (problem_ID, analysis_data_isproblem, analysis_data_dir)
         VALUES (?1, ?2, '/analysis')",
        params![problem_id, is_problem],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn insert_problem(store: &Store) -> i64 {
    let conn = store.connection();
    conn.execute(
        "INSERT INTO problem_table (problem_name, problem_status) VALUES ('drift', 'open')",
        [],
    )
    .unwrap();
    conn.last_insert_rowid()
}

#[test]
#[timeout(5000)]
fn test_consistent_store_is_clean() {
    let store = schema_store();
    let (video, task) = seed_video_and_task(&store);
    insert_tag(&store, video, task, 0, 120);
    let lib = insert_library(&store, "1.0.0", HASH_A, None);
    insert_library(&store, "1.1.0", HASH_B, Some(lib));
    insert_algorithm(&store, "0.1", HASH_C, None);
    let problem = insert_problem(&store);
    insert_analysis_data(&store, Some(1), Some(problem));
    insert_analysis_data(&store, Some(0), None);

    let report = IntegrityAuditor::new().audit(&store);
    assert!(report.is_clean(), "unexpected findings: {report:?}");

    let relationships: usize = EXPECTED_TABLES.iter().map(|t| t.foreign_keys.len()).sum();
    assert_eq!(report.orphaned_counts.len(), relationships);
    assert!(report.orphaned_counts.values().all(|&count| count == 0));
    assert_eq!(report.duplicate_hash_groups.len(), 2);
    assert_eq!(report.malformed_hashes.len(), 2);
}

#[test]
fn test_interval_violations() {
    let store = schema_store();
    let (video, task) = seed_video_and_task(&store);
    let inverted = insert_tag(&store, video, task, 10, 5);
    insert_tag(&store, video, task, 5, 10);
    let empty = insert_tag(&store, video, task, 7, 7);
    let negative = insert_tag(&store, video, task, -1, 3);

    let report = IntegrityAuditor::new().audit(&store);
    let ids: Vec<i64> = report.interval_violations.iter().map(|v| v.tag_id).collect();
    assert_eq!(ids, vec![inverted, empty, negative]);

    let first = &report.interval_violations[0];
    assert_eq!(first.start, CellValue::Integer(10));
    assert_eq!(first.end, CellValue::Integer(5));
    assert_eq!(first.video_id.as_integer(), Some(video));
    assert_eq!(first.task_id.as_integer(), Some(task));
    assert!(!report.is_clean());
}

#[test]
fn test_interval_check_tolerates_mixed_storage_classes() {
    let store = schema_store();
    let (video, task) = seed_video_and_task(&store);
    let inverted = insert_tag(&store, video, task, 10, 5);
    exec(
        &store,
        &format!(
            "INSERT INTO tag_table (video_ID, task_ID, start, \"end\") VALUES
             ({video}, {task}, 7.5, 2),
             ({video}, {task}, 'abc', 5),
             ({video}, {task}, 1.5, 4);"
        ),
    );

    let report = IntegrityAuditor::new().audit(&store);
    assert!(
        !report.check_failures.iter().any(|f| f.check == "interval_validation"),
        "interval check failed: {:?}",
        report.check_failures
    );
    let found: Vec<(i64, CellValue, CellValue)> = report
        .interval_violations
        .iter()
        .map(|v| (v.tag_id, v.start.clone(), v.end.clone()))
        .collect();
    assert_eq!(
        found,
        vec![
            (inverted, CellValue::Integer(10), CellValue::Integer(5)),
            (inverted + 1, CellValue::Real(7.5), CellValue::Integer(2)),
            (inverted + 2, CellValue::Text("abc".to_string()), CellValue::Integer(5)),
        ]
    );
}

#[test]
fn test_foreign_key_violations_and_orphans() {
    let store = unenforced_store();
    let (video, task) = seed_video_and_task(&store);
    insert_tag(&store, video, task, 0, 10);
    let orphan = insert_tag(&store, 99, task, 0, 10);
    exec(
        &store,
        "INSERT INTO core_lib_output_table (core_lib_ID, video_ID, core_lib_output_dir)
         VALUES (NULL, NULL, '/out');",
    );

    let report = IntegrityAuditor::new().audit(&store);

    assert_eq!(report.foreign_key_violations.len(), 1);
    let violation = &report.foreign_key_violations[0];
    assert_eq!(violation.table, "tag_table");
    assert_eq!(violation.rowid, Some(orphan));
    assert_eq!(violation.parent_table, "video_table");
    assert_eq!(violation.from_column.as_deref(), Some("video_ID"));

    assert_eq!(report.orphaned_counts["tag_table.video_ID -> video_table.video_ID"], 1);
    assert_eq!(report.orphaned_counts["tag_table.task_ID -> task_table.task_ID"], 0);
    // NULL references are not orphans.
    assert_eq!(
        report.orphaned_counts["core_lib_output_table.core_lib_ID -> core_lib_table.core_lib_ID"],
        0
    );
    assert!(report.check_failures.is_empty());
    assert!(!report.is_clean());
}

#[test]
fn test_duplicate_commit_hashes() {
    let sql = schema_with("core_lib_commit_hash TEXT UNIQUE", "core_lib_commit_hash TEXT");
    let store = store_with(&CatalogConfig::default(), &sql);
    let first = insert_library(&store, "1.0.0", HASH_A, None);
    let second = insert_library(&store, "1.0.1", HASH_A, None);
    insert_library(&store, "1.1.0", HASH_B, None);

    let report = IntegrityAuditor::new().audit(&store);
    let groups = &report.duplicate_hash_groups[&VersionKind::Library];
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].commit_hash, HASH_A);
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups[0].ids, vec![first, second]);
    assert!(report.duplicate_hash_groups[&VersionKind::Algorithm].is_empty());
}

#[test]
fn test_malformed_commit_hashes() {
    let store = schema_store();
    insert_library(&store, "1.0.0", HASH_A, None);
    let short = insert_library(&store, "1.0.1", "abc123", None);
    let upper = insert_algorithm(&store, "0.1", &HASH_B.to_uppercase(), None);

    let report = IntegrityAuditor::new().audit(&store);
    let libs = &report.malformed_hashes[&VersionKind::Library];
    assert_eq!(libs.len(), 1);
    assert_eq!(libs[0].id, short);
    assert_eq!(libs[0].commit_hash, "abc123");
    let algs = &report.malformed_hashes[&VersionKind::Algorithm];
    assert_eq!(algs.len(), 1);
    assert_eq!(algs[0].id, upper);
}

#[test]
fn test_problem_flag_consistency() {
    let store = schema_store();
    let problem = insert_problem(&store);
    let missing = insert_analysis_data(&store, Some(1), None);
    let unexpected = insert_analysis_data(&store, Some(0), Some(problem));
    insert_analysis_data(&store, Some(1), Some(problem));
    insert_analysis_data(&store, Some(0), None);
    insert_analysis_data(&store, None, None);

    let report = IntegrityAuditor::new().audit(&store);
    let found: Vec<(i64, ProblemFlagReason)> = report
        .problem_flag_violations
        .iter()
        .map(|v| (v.analysis_data_id, v.reason))
        .collect();
    assert_eq!(
        found,
        vec![
            (missing, ProblemFlagReason::MissingProblem),
            (unexpected, ProblemFlagReason::UnexpectedProblem),
        ]
    );
}

#[test]
fn test_invalid_problem_flag() {
    let sql = schema_with(
        "analysis_data_isproblem INTEGER CHECK (analysis_data_isproblem IN (0, 1))",
        "analysis_data_isproblem INTEGER",
    );
    let store = store_with(&CatalogConfig::default(), &sql);
    let flagged = insert_analysis_data(&store, Some(2), None);

    let report = IntegrityAuditor::new().audit(&store);
    assert_eq!(report.problem_flag_violations.len(), 1);
    assert_eq!(report.problem_flag_violations[0].analysis_data_id, flagged);
    assert_eq!(report.problem_flag_violations[0].reason, ProblemFlagReason::InvalidFlag);
}

#[test]
fn test_text_problem_flag_is_invalid() {
    let sql = schema_with(
        "analysis_data_isproblem INTEGER CHECK (analysis_data_isproblem IN (0, 1))",
        "analysis_data_isproblem INTEGER",
    );
    let store = store_with(&CatalogConfig::default(), &sql);
    let missing = insert_analysis_data(&store, Some(1), None);
    exec(
        &store,
        "INSERT INTO analysis_data_table (problem_ID, analysis_data_isproblem) VALUES (NULL, 'yes');",
    );
    let texty = missing + 1;

    let report = IntegrityAuditor::new().audit(&store);
    assert!(
        !report.check_failures.iter().any(|f| f.check == "problem_flag"),
        "problem flag check failed: {:?}",
        report.check_failures
    );
    let found: Vec<(i64, ProblemFlagReason)> = report
        .problem_flag_violations
        .iter()
        .map(|v| (v.analysis_data_id, v.reason))
        .collect();
    assert_eq!(
        found,
        vec![
            (missing, ProblemFlagReason::MissingProblem),
            (texty, ProblemFlagReason::InvalidFlag),
        ]
    );
    assert_eq!(
        report.problem_flag_violations[1].is_problem,
        CellValue::Text("yes".to_string())
    );
    assert!(report.problem_flag_violations[1].problem_id.is_null());
}

#[test]
fn test_checks_run_independently_on_empty_store() {
    let store = Store::in_memory(&CatalogConfig::default()).unwrap();

    let report = IntegrityAuditor::new().audit(&store);
    assert!(!report.is_clean());
    assert!(report.foreign_key_violations.is_empty());
    let failed: Vec<&str> = report.check_failures.iter().map(|f| f.check.as_str()).collect();
    assert!(!failed.contains(&"foreign_key_check"));
    assert!(failed.contains(&"interval_validation"));
    assert!(failed.contains(&"problem_flag"));
    assert!(failed.contains(&"duplicate_hashes:library"));
    assert!(failed.contains(&"malformed_hashes:algorithm"));
    assert!(failed.iter().any(|check| check.starts_with("orphans:")));
    assert!(report.orphaned_counts.is_empty());
}

#[test]
fn test_partial_store_keeps_remaining_checks() {
    let store = schema_store();
    let (video, task) = seed_video_and_task(&store);
    insert_tag(&store, video, task, 9, 3);
    exec(&store, "DROP TABLE analysis_data_table;");

    let report = IntegrityAuditor::new().audit(&store);
    assert_eq!(report.interval_violations.len(), 1);
    assert!(report
        .check_failures
        .iter()
        .any(|f| f.check == "problem_flag"));
    assert!(report
        .check_failures
        .iter()
        .all(|f| f.check == "problem_flag" || f.check.starts_with("orphans:analysis_data_table.")));
}
