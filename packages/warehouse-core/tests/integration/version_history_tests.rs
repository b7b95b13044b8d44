//! Version lineage reconstruction.

use ntest::timeout;
use warehouse_core::versions::{get_version, version_history, VersionKind};
use warehouse_core::CatalogError;

use super::helpers::{
    exec, insert_algorithm, insert_library, schema_store, unenforced_store, HASH_A,
    HASH_B, HASH_C,
};

#[test]
fn test_chain_is_returned_oldest_first() {
    let store = schema_store();
    let a = insert_library(&store, "1.0.0", HASH_A, None);
    let b = insert_library(&store, "1.1.0", HASH_B, Some(a));
    let c = insert_library(&store, "2.0.0", HASH_C, Some(b));

    let history = version_history(&store, VersionKind::Library, c).unwrap();
    let ids: Vec<i64> = history.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![a, b, c]);
    assert_eq!(history[0].version.as_deref(), Some("1.0.0"));
    assert_eq!(history[0].base_version_id, None);
    assert_eq!(history[2].base_version_id, Some(b));
    assert_eq!(history[2].commit_hash.as_deref(), Some(HASH_C));
    assert_eq!(history[1].update_info.as_deref(), Some("release 1.1.0"));
}

#[test]
fn test_history_from_middle_stops_at_root() {
    let store = schema_store();
    let a = insert_library(&store, "1.0.0", HASH_A, None);
    let b = insert_library(&store, "1.1.0", HASH_B, Some(a));
    insert_library(&store, "2.0.0", HASH_C, Some(b));

    let ids: Vec<i64> = version_history(&store, VersionKind::Library, b)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![a, b]);
}

#[test]
fn test_unknown_start_yields_empty_history() {
    let store = schema_store();
    insert_algorithm(&store, "0.1", HASH_A, None);

    let history = version_history(&store, VersionKind::Algorithm, 999).unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_dangling_base_ends_chain() {
    let store = unenforced_store();
    let a = insert_algorithm(&store, "0.1", HASH_A, Some(42));
    let b = insert_algorithm(&store, "0.2", HASH_B, Some(a));

    let ids: Vec<i64> = version_history(&store, VersionKind::Algorithm, b)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![a, b]);
}

#[test]
fn test_kinds_are_independent() {
    let store = schema_store();
    let lib = insert_library(&store, "1.0.0", HASH_A, None);
    let alg_root = insert_algorithm(&store, "0.1", HASH_A, None);
    let alg = insert_algorithm(&store, "0.2", HASH_B, Some(alg_root));

    let libs = version_history(&store, VersionKind::Library, lib).unwrap();
    assert_eq!(libs.len(), 1);
    let algs = version_history(&store, VersionKind::Algorithm, alg).unwrap();
    assert_eq!(algs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![alg_root, alg]);
}

#[test]
#[timeout(5000)]
fn test_cycle_fails_instead_of_looping() {
    let store = schema_store();
    let a = insert_library(&store, "1.0.0", HASH_A, None);
    let b = insert_library(&store, "1.1.0", HASH_B, Some(a));
    exec(
        &store,
        &format!("UPDATE core_lib_table SET core_lib_base_version_ID = {b} WHERE core_lib_ID = {a};"),
    );

    let err = version_history(&store, VersionKind::Library, b).unwrap_err();
    match err {
        CatalogError::Constraint {
            table, constraint, ..
        } => {
            assert_eq!(table, "core_lib_table");
            assert_eq!(constraint, "base_version_chain");
        }
        other => panic!("expected constraint error, got {other:?}"),
    }
}

#[test]
#[timeout(5000)]
fn test_self_reference_is_a_cycle() {
    let store = schema_store();
    let a = insert_algorithm(&store, "0.1", HASH_A, None);
    exec(
        &store,
        &format!("UPDATE algorithm_table SET algorithm_base_version_ID = {a} WHERE algorithm_ID = {a};"),
    );

    let err = version_history(&store, VersionKind::Algorithm, a).unwrap_err();
    assert_eq!(err.code(), "E001");
}

#[test]
fn test_get_version() {
    let store = schema_store();
    let a = insert_library(&store, "1.0.0", HASH_A, None);

    let record = get_version(&store, VersionKind::Library, a).unwrap();
    assert_eq!(record.id, a);
    assert_eq!(record.version.as_deref(), Some("1.0.0"));

    let err = get_version(&store, VersionKind::Library, a + 1).unwrap_err();
    assert_eq!(
        err,
        CatalogError::NotFound {
            table: "core_lib_table".to_string(),
            record_id: a + 1,
        }
    );
}
