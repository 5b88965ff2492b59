//! v002: scope columns.
//!
//! Attendance and both rule tables become scoped by an optional site; manual
//! adjustments get a free-text note. Purely additive.

use crate::ddl::add_column_if_missing;
use crate::error::MigrateResult;
use rusqlite::Connection;

const COLUMNS: &[(&str, &str, &str)] = &[
    ("attendance", "site_id", "INTEGER"),
    ("overtime_rules", "site_id", "INTEGER"),
    ("holiday_overtime_rules", "site_id", "INTEGER"),
    ("adjustments", "note", "TEXT"),
];

pub fn apply(conn: &Connection) -> MigrateResult<()> {
    for (table, column, declaration) in COLUMNS {
        if add_column_if_missing(conn, table, column, declaration)? {
            log::debug!("Added {table}.{column}");
        }
    }
    Ok(())
}
