//! Metadata store schema migrations.
//!
//! # Invariants
//! - `version` values are strictly increasing.
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - All pending migrations apply in one transaction.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_metadata.sql"),
}];

/// Latest schema version this build understands.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the store schema up to `latest_version()`.
///
/// Stores written by a newer build are rejected rather than read with a
/// schema this build does not know.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let store_version = schema_version(conn)?;
    let latest = latest_version();

    if store_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            store_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > store_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
    }
    tx.commit()?;
    Ok(())
}

/// Current `PRAGMA user_version` of the store.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn fresh_store_reaches_latest_version_and_reapply_is_noop() {
        let mut conn = Connection::open_in_memory().expect("in-memory connection");
        apply_migrations(&mut conn).expect("first apply");
        apply_migrations(&mut conn).expect("second apply");
        assert_eq!(
            schema_version(&conn).expect("version readable"),
            latest_version()
        );
    }

    #[test]
    fn newer_store_is_rejected() {
        let mut conn = Connection::open_in_memory().expect("in-memory connection");
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .expect("bump version");
        let err = apply_migrations(&mut conn).expect_err("newer schema must fail");
        assert!(matches!(err, DbError::UnsupportedSchemaVersion { .. }));
    }
}
