//! v003: the `sites` table.
//!
//! Some installations created `sites` by hand before it was part of the
//! schema, naming the start-of-shift column `shift_start`. Those tables are
//! rebuilt so the value lands in `reference_start_time`.

use crate::ddl::{create_or_repair, ColumnRename, RepairOutcome};
use crate::error::MigrateResult;
use rusqlite::Connection;

pub(crate) const TABLE: &str = "sites";

pub(crate) const DEFINITION: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    reference_start_time TEXT";

const RENAMES: &[ColumnRename<'static>] = &[ColumnRename {
    legacy: "shift_start",
    current: "reference_start_time",
}];

pub fn apply(conn: &Connection) -> MigrateResult<()> {
    match create_or_repair(conn, TABLE, DEFINITION, RENAMES)? {
        RepairOutcome::Created => log::debug!("Created {TABLE}"),
        RepairOutcome::Unchanged => log::debug!("{TABLE} already current"),
        RepairOutcome::Repaired => log::info!("Moved {TABLE}.shift_start to reference_start_time"),
    }
    Ok(())
}
