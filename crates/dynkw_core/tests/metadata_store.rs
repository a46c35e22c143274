mod common;

use common::{contoso_metadata, contoso_ref, keyword_class};
use dynkw_core::db::migrations::latest_version;
use dynkw_core::db::{delete_module_metadata, open_db, open_db_in_memory, write_module_metadata, DbError};
use dynkw_core::metadata::ModuleMetadata;
use dynkw_core::model::spec::{BodyMode, ModuleRef, UseMode};
use dynkw_core::{discover_keywords, MetadataError, MetadataRepository, SqliteMetadataRepository};
use rusqlite::Connection;

#[test]
fn fresh_store_has_full_schema() {
    let conn = open_db_in_memory().expect("open store");
    assert_eq!(schema_version(&conn), latest_version());
    for table in ["modules", "types", "members", "attributes", "attribute_args", "enum_fields"] {
        assert!(table_exists(&conn, table), "missing table {table}");
    }
}

#[test]
fn store_with_newer_schema_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("future.dkw");
    let conn = Connection::open(&path).expect("raw open");
    conn.execute_batch("PRAGMA user_version = 999;")
        .expect("bump version");
    drop(conn);

    match open_db(&path).expect_err("newer schema") {
        DbError::UnsupportedSchemaVersion {
            store_version,
            latest_supported,
        } => {
            assert_eq!(store_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn written_metadata_reads_back_identically_after_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("modules.dkw");
    let metadata = contoso_metadata();

    let mut conn = open_db(&path).expect("open store");
    write_module_metadata(&mut conn, &metadata).expect("write module");
    drop(conn);

    let conn = open_db(&path).expect("reopen store");
    let repo = SqliteMetadataRepository::new(&conn);
    assert_eq!(repo.list_modules().expect("list"), vec![contoso_ref()]);
    assert_eq!(
        repo.find_module("contoso.dsl").expect("find"),
        Some(contoso_ref())
    );

    let loaded = repo.load_module(contoso_ref().id).expect("load module");
    assert_eq!(loaded, metadata);

    let forest = discover_keywords(&loaded).expect("stored metadata discovers");
    assert_eq!(forest.len(), 3);
    assert_eq!(
        forest["Config"]
            .property("Mode")
            .map(|mode| mode.enum_values.len()),
        Some(2)
    );
}

#[test]
fn rewriting_a_module_replaces_it() {
    let mut conn = open_db_in_memory().expect("open store");
    write_module_metadata(&mut conn, &contoso_metadata()).expect("first write");

    let replacement = ModuleMetadata::new(ModuleRef::generate("Contoso.Dsl", "2.0.0")).with_type(
        keyword_class("Only", BodyMode::Command, UseMode::OptionalMany),
    );
    write_module_metadata(&mut conn, &replacement).expect("second write");

    let repo = SqliteMetadataRepository::new(&conn);
    let modules = repo.list_modules().expect("list");
    assert_eq!(modules, vec![replacement.module.clone()]);
    assert!(matches!(
        repo.load_module(contoso_ref().id),
        Err(MetadataError::NotFound(_))
    ));
    assert_eq!(count(&conn, "types"), 1);

    assert!(delete_module_metadata(&conn, &replacement.module).expect("delete"));
    assert!(!delete_module_metadata(&conn, &replacement.module).expect("delete again"));
    assert_eq!(count(&conn, "types"), 0);
    assert_eq!(count(&conn, "attributes"), 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .expect("user_version readable")
}

fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .expect("sqlite_master readable")
        == 1
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .expect("count readable")
}
