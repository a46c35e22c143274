//! Writes module metadata into the store.

use super::DbResult;
use crate::metadata::{AttributeRecord, AttributeValue, ModuleMetadata, TypeRecord};
use crate::model::spec::ModuleRef;
use log::{error, info};
use rusqlite::{params, Connection, Transaction};
use std::time::Instant;

/// Stores `metadata`, replacing any module with the same identity or name.
///
/// # Side effects
/// - Runs in one transaction; on error the store is unchanged.
/// - Emits `metadata_write` events with type counts, never member values.
pub fn write_module_metadata(conn: &mut Connection, metadata: &ModuleMetadata) -> DbResult<()> {
    let started_at = Instant::now();
    let module = &metadata.module;
    info!(
        "event=metadata_write module=db status=start target={} types={}",
        module,
        metadata.types.len()
    );

    let outcome = (|| -> DbResult<()> {
        let tx = conn.transaction()?;
        delete_existing(&tx, module)?;
        tx.execute(
            "INSERT INTO modules (uuid, name, version) VALUES (?1, ?2, ?3);",
            params![module.id.to_string(), module.name, module.version],
        )?;
        for (ordinal, record) in metadata.types.iter().enumerate() {
            insert_type(&tx, module, None, ordinal, record)?;
        }
        tx.commit()?;
        Ok(())
    })();

    match &outcome {
        Ok(()) => info!(
            "event=metadata_write module=db status=ok target={} duration_ms={}",
            module,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=metadata_write module=db status=error target={} duration_ms={} error={}",
            module,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    outcome
}

/// Removes a module and all of its records. Returns whether it existed.
pub fn delete_module_metadata(conn: &Connection, module: &ModuleRef) -> DbResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM modules WHERE uuid = ?1;",
        params![module.id.to_string()],
    )?;
    Ok(deleted > 0)
}

fn delete_existing(tx: &Transaction<'_>, module: &ModuleRef) -> DbResult<()> {
    tx.execute(
        "DELETE FROM modules WHERE uuid = ?1 OR name = ?2;",
        params![module.id.to_string(), module.name],
    )?;
    Ok(())
}

fn insert_type(
    tx: &Transaction<'_>,
    module: &ModuleRef,
    enclosing_id: Option<i64>,
    ordinal: usize,
    record: &TypeRecord,
) -> DbResult<()> {
    tx.execute(
        "INSERT INTO types (module_uuid, enclosing_id, ordinal, name, base_type, kind)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            module.id.to_string(),
            enclosing_id,
            ordinal as i64,
            record.name,
            record.base_type.as_deref(),
            record.kind.as_str(),
        ],
    )?;
    let type_id = tx.last_insert_rowid();

    for (index, attribute) in record.attributes.iter().enumerate() {
        insert_attribute(tx, Some(type_id), None, index, attribute)?;
    }

    for (index, member) in record.members.iter().enumerate() {
        tx.execute(
            "INSERT INTO members (type_id, ordinal, name, type_signature, kind, settable)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                type_id,
                index as i64,
                member.name,
                member.type_name,
                member.kind.as_str(),
                i64::from(member.settable),
            ],
        )?;
        let member_id = tx.last_insert_rowid();
        for (attr_index, attribute) in member.attributes.iter().enumerate() {
            insert_attribute(tx, None, Some(member_id), attr_index, attribute)?;
        }
    }

    for (index, field) in record.enum_fields.iter().enumerate() {
        tx.execute(
            "INSERT INTO enum_fields (type_id, ordinal, name) VALUES (?1, ?2, ?3);",
            params![type_id, index as i64, field],
        )?;
    }

    for (index, nested) in record.nested.iter().enumerate() {
        insert_type(tx, module, Some(type_id), index, nested)?;
    }
    Ok(())
}

fn insert_attribute(
    tx: &Transaction<'_>,
    type_id: Option<i64>,
    member_id: Option<i64>,
    ordinal: usize,
    attribute: &AttributeRecord,
) -> DbResult<()> {
    tx.execute(
        "INSERT INTO attributes (type_id, member_id, ordinal, name) VALUES (?1, ?2, ?3, ?4);",
        params![type_id, member_id, ordinal as i64, attribute.name],
    )?;
    let attribute_id = tx.last_insert_rowid();

    for (index, (name, value)) in attribute.arguments.iter().enumerate() {
        tx.execute(
            "INSERT INTO attribute_args (attribute_id, ordinal, name, value_kind, value)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![attribute_id, index as i64, name, value.kind(), encode_value(value)],
        )?;
    }
    Ok(())
}

fn encode_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Bool(flag) => flag.to_string(),
        AttributeValue::Int(number) => number.to_string(),
        AttributeValue::String(text) => text.clone(),
    }
}
