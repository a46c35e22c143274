//! SQLite-backed module metadata store.
//!
//! # Responsibility
//! - Open and configure metadata store connections.
//! - Apply the store schema in deterministic order.
//! - Write module metadata produced at module-build time.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Nothing reads or writes metadata before migrations succeed.
//! - A module is written all-or-nothing; rewriting replaces it wholesale.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod writer;

pub use open::{open_db, open_db_in_memory};
pub use writer::{delete_module_metadata, write_module_metadata};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        store_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                store_version,
                latest_supported,
            } => write!(
                f,
                "metadata store schema version {store_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
