//! v001: base tables.

use crate::error::MigrateResult;
use rusqlite::Connection;

const SQL: &str = include_str!("v001_initial_schema.sql");

pub fn apply(conn: &Connection) -> MigrateResult<()> {
    conn.execute_batch(SQL)?;
    Ok(())
}
