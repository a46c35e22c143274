//! Read access to module metadata in the store.
//!
//! # Responsibility
//! - List stored modules and load one module's full record tree.
//!
//! # Invariants
//! - Reads never touch module code; the store is the only input.
//! - Persisted rows that do not map to a record are reported as
//!   `InvalidData`, never skipped.

use crate::db::DbError;
use crate::metadata::{
    AttributeRecord, AttributeValue, MemberKind, MemberRecord, ModuleMetadata, TypeKind,
    TypeRecord,
};
use crate::model::spec::ModuleRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type MetadataResult<T> = Result<T, MetadataError>;

#[derive(Debug)]
pub enum MetadataError {
    Db(DbError),
    NotFound(String),
    InvalidData(String),
}

impl Display for MetadataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(module) => write!(f, "module not found in metadata store: {module}"),
            Self::InvalidData(message) => write!(f, "invalid stored metadata: {message}"),
        }
    }
}

impl Error for MetadataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for MetadataError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for MetadataError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub trait MetadataRepository {
    /// Stored modules ordered by name.
    fn list_modules(&self) -> MetadataResult<Vec<ModuleRef>>;
    /// Case-insensitive lookup by module name.
    fn find_module(&self, name: &str) -> MetadataResult<Option<ModuleRef>>;
    fn load_module(&self, id: Uuid) -> MetadataResult<ModuleMetadata>;
}

pub struct SqliteMetadataRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMetadataRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_types(&self, module_uuid: &str, enclosing_id: Option<i64>) -> MetadataResult<Vec<TypeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, base_type, kind
             FROM types
             WHERE module_uuid = ?1 AND enclosing_id IS ?2
             ORDER BY ordinal;",
        )?;
        let rows = stmt
            .query_map(params![module_uuid, enclosing_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, name, base_type, kind) in rows {
            let kind = TypeKind::parse(&kind)
                .ok_or_else(|| MetadataError::InvalidData(format!("type `{name}` has kind `{kind}`")))?;
            records.push(TypeRecord {
                attributes: self.load_attributes("type_id", id)?,
                members: self.load_members(id)?,
                enum_fields: self.load_enum_fields(id)?,
                nested: self.load_types(module_uuid, Some(id))?,
                name,
                base_type,
                kind,
            });
        }
        Ok(records)
    }

    fn load_members(&self, type_id: i64) -> MetadataResult<Vec<MemberRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, type_signature, kind, settable
             FROM members
             WHERE type_id = ?1
             ORDER BY ordinal;",
        )?;
        let rows = stmt
            .query_map(params![type_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, type_name, kind, settable)| {
                let kind = MemberKind::parse(&kind).ok_or_else(|| {
                    MetadataError::InvalidData(format!("member `{name}` has kind `{kind}`"))
                })?;
                Ok(MemberRecord {
                    attributes: self.load_attributes("member_id", id)?,
                    settable: settable != 0,
                    name,
                    type_name,
                    kind,
                })
            })
            .collect()
    }

    fn load_attributes(&self, owner_column: &str, owner_id: i64) -> MetadataResult<Vec<AttributeRecord>> {
        let sql = format!(
            "SELECT id, name FROM attributes WHERE {owner_column} = ?1 ORDER BY ordinal;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut args_stmt = self.conn.prepare(
            "SELECT name, value_kind, value
             FROM attribute_args
             WHERE attribute_id = ?1
             ORDER BY ordinal;",
        )?;
        let mut attributes = Vec::with_capacity(rows.len());
        for (id, name) in rows {
            let arguments = args_stmt
                .query_and_then(params![id], parse_argument_row)?
                .collect::<MetadataResult<Vec<_>>>()?;
            attributes.push(AttributeRecord { name, arguments });
        }
        Ok(attributes)
    }

    fn load_enum_fields(&self, type_id: i64) -> MetadataResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM enum_fields WHERE type_id = ?1 ORDER BY ordinal;")?;
        let fields = stmt
            .query_map(params![type_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(fields)
    }
}

impl MetadataRepository for SqliteMetadataRepository<'_> {
    fn list_modules(&self) -> MetadataResult<Vec<ModuleRef>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name, version FROM modules ORDER BY name COLLATE NOCASE;")?;
        let modules = stmt
            .query_and_then([], parse_module_row)?
            .collect::<MetadataResult<Vec<_>>>()?;
        Ok(modules)
    }

    fn find_module(&self, name: &str) -> MetadataResult<Option<ModuleRef>> {
        let row = self
            .conn
            .query_row(
                "SELECT uuid, name, version FROM modules WHERE name = ?1;",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(uuid, name, version)| module_ref(&uuid, name, version))
            .transpose()
    }

    fn load_module(&self, id: Uuid) -> MetadataResult<ModuleMetadata> {
        let uuid = id.to_string();
        let module = self
            .conn
            .query_row(
                "SELECT uuid, name, version FROM modules WHERE uuid = ?1;",
                params![uuid],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| MetadataError::NotFound(uuid.clone()))?;
        let (stored_uuid, name, version) = module;

        Ok(ModuleMetadata {
            module: module_ref(&stored_uuid, name, version)?,
            types: self.load_types(&uuid, None)?,
        })
    }
}

fn parse_module_row(row: &Row<'_>) -> MetadataResult<ModuleRef> {
    let uuid: String = row.get(0)?;
    module_ref(&uuid, row.get(1)?, row.get(2)?)
}

fn module_ref(uuid: &str, name: String, version: String) -> MetadataResult<ModuleRef> {
    let id = Uuid::parse_str(uuid)
        .map_err(|err| MetadataError::InvalidData(format!("module uuid `{uuid}`: {err}")))?;
    Ok(ModuleRef::new(id, name, version))
}

fn parse_argument_row(row: &Row<'_>) -> MetadataResult<(String, AttributeValue)> {
    let name: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let raw: String = row.get(2)?;
    let value = match kind.as_str() {
        "bool" => raw.parse::<bool>().map(AttributeValue::Bool).ok(),
        "int" => raw.parse::<i64>().map(AttributeValue::Int).ok(),
        "string" => Some(AttributeValue::String(raw.clone())),
        _ => None,
    }
    .ok_or_else(|| {
        MetadataError::InvalidData(format!("argument `{name}` has {kind} value `{raw}`"))
    })?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::{MetadataError, MetadataRepository, SqliteMetadataRepository};
    use crate::db::open_db_in_memory;
    use uuid::Uuid;

    #[test]
    fn empty_store_lists_nothing_and_misses_unknown_module() {
        let conn = open_db_in_memory().expect("open store");
        let repo = SqliteMetadataRepository::new(&conn);
        assert!(repo.list_modules().expect("list").is_empty());
        assert!(repo.find_module("Nope").expect("find").is_none());
        assert!(matches!(
            repo.load_module(Uuid::new_v4()),
            Err(MetadataError::NotFound(_))
        ));
    }
}
