//! Row access for tracked application tables
//!
//! These take a plain `&Connection` so they compose inside the restore
//! transaction and the per-entry savepoints used by replay and undo.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::VaultResult;
use crate::models::{Row, TrackedTable};

/// Every row of `table`, ordered by primary key
pub fn select_all(conn: &Connection, table: TrackedTable) -> VaultResult<Vec<Row>> {
    let mut stmt = conn.prepare_cached(&table.statements().select_all)?;
    let rows = stmt
        .query_map([], |row| Row::from_sql(table, row))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn find(conn: &Connection, table: TrackedTable, key: &SqlValue) -> VaultResult<Option<Row>> {
    let mut stmt = conn.prepare_cached(&table.statements().select_one)?;
    let row = stmt
        .query_row(params![key], |row| Row::from_sql(table, row))
        .optional()?;
    Ok(row)
}

pub fn exists(conn: &Connection, table: TrackedTable, key: &SqlValue) -> VaultResult<bool> {
    Ok(find(conn, table, key)?.is_some())
}

/// Plain insert; a key collision is an error
pub fn insert(conn: &Connection, row: &Row) -> VaultResult<()> {
    let mut stmt = conn.prepare_cached(&row.table().statements().insert)?;
    stmt.execute(params_from_iter(row.values()))?;
    Ok(())
}

/// Insert unless the key already exists; returns whether a row was written
pub fn insert_or_ignore(conn: &Connection, row: &Row) -> VaultResult<bool> {
    let mut stmt = conn.prepare_cached(&row.table().statements().insert_or_ignore)?;
    let changed = stmt.execute(params_from_iter(row.values()))?;
    Ok(changed > 0)
}

/// Overwrite every non-key column; returns whether the key existed
pub fn update(conn: &Connection, row: &Row) -> VaultResult<bool> {
    let mut stmt = conn.prepare_cached(&row.table().statements().update)?;
    let changed = stmt.execute(params_from_iter(row.update_params()))?;
    Ok(changed > 0)
}

/// Returns whether a row was removed
pub fn delete(conn: &Connection, table: TrackedTable, key: &SqlValue) -> VaultResult<bool> {
    let mut stmt = conn.prepare_cached(&table.statements().delete)?;
    let changed = stmt.execute(params![key])?;
    Ok(changed > 0)
}

/// Remove every row; returns the number removed
pub fn clear(conn: &Connection, table: TrackedTable) -> VaultResult<usize> {
    Ok(conn.execute(&table.statements().clear, [])?)
}

pub fn count(conn: &Connection, table: TrackedTable) -> VaultResult<u64> {
    let n: i64 = conn.query_row(&table.statements().count, [], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}
