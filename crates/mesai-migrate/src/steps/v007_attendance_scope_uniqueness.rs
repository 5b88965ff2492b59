//! v007: attendance is unique per (date, employee, site).
//!
//! The original inline `UNIQUE(work_date, employee_name)` made it impossible
//! to record the same person at two sites on one day. It is replaced by the
//! unique index [`SCOPE_INDEX`] over `(work_date, employee_name,
//! COALESCE(site_id, -1))`, so rows without a site still collide with each
//! other.
//!
//! Rows that would violate the new rule are not silently deleted: within each
//! colliding group the row with the highest `id` is kept and the others are
//! copied into `attendance_dedupe_audit` before they are removed.

use crate::ddl::add_column_if_missing;
use crate::error::MigrateResult;
use crate::introspect::{has_unique_constraint, index_exists, table_exists};
use crate::rebuild::Rebuild;
use rusqlite::{params, Connection};

const TABLE: &str = "attendance";

/// Name of the scoped uniqueness index.
pub const SCOPE_INDEX: &str = "idx_attendance_day_scope";

/// Stand-in for a missing `site_id` inside the uniqueness key.
pub const SCOPE_SENTINEL: i64 = -1;

/// Table receiving quarantined duplicate rows.
pub const AUDIT_TABLE: &str = "attendance_dedupe_audit";

/// `reason` recorded for rows quarantined by this step.
pub const DEDUPE_REASON: &str = "v007_attendance_scope_uniqueness";

const DEFINITION: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_date TEXT NOT NULL,
    employee_name TEXT NOT NULL,
    site_id INTEGER,
    check_in TEXT,
    check_out TEXT";

const AUDIT_DDL: &str = "CREATE TABLE IF NOT EXISTS attendance_dedupe_audit (
    audit_id INTEGER PRIMARY KEY AUTOINCREMENT,
    original_id INTEGER NOT NULL,
    work_date TEXT,
    employee_name TEXT,
    site_id INTEGER,
    check_in TEXT,
    check_out TEXT,
    reason TEXT NOT NULL,
    quarantined_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Rows that share their scope key with a row of higher id.
const SUPERSEDED: &str = "EXISTS (
    SELECT 1 FROM attendance newer
    WHERE newer.work_date = attendance.work_date
      AND newer.employee_name = attendance.employee_name
      AND COALESCE(newer.site_id, ?1) = COALESCE(attendance.site_id, ?1)
      AND newer.id > attendance.id
)";

pub fn apply(conn: &Connection) -> MigrateResult<()> {
    if index_exists(conn, SCOPE_INDEX)? {
        log::debug!("{SCOPE_INDEX} already present");
        return Ok(());
    }

    if table_exists(conn, &Rebuild::shadow_name_for(TABLE))? {
        Rebuild::new(TABLE, DEFINITION).run(conn)?;
    }
    add_column_if_missing(conn, TABLE, "site_id", "INTEGER")?;

    let quarantined = quarantine_duplicates(conn)?;
    if quarantined > 0 {
        log::warn!("Moved {quarantined} duplicate attendance rows to {AUDIT_TABLE}");
    }

    if has_unique_constraint(conn, TABLE, &["work_date", "employee_name"])? {
        let stats = Rebuild::new(TABLE, DEFINITION).run(conn)?;
        log::info!(
            "Rebuilt {TABLE} without its date/employee constraint: {} rows",
            stats.copied
        );
    }

    conn.execute_batch(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {SCOPE_INDEX}
            ON {TABLE} (work_date, employee_name, COALESCE(site_id, {SCOPE_SENTINEL}))"
    ))?;
    Ok(())
}

/// Copy every superseded row into the audit table, then delete it.
/// Returns the number of rows moved.
fn quarantine_duplicates(conn: &Connection) -> MigrateResult<usize> {
    conn.execute_batch(AUDIT_DDL)?;
    let copied = conn.execute(
        &format!(
            "INSERT INTO {AUDIT_TABLE}
                 (original_id, work_date, employee_name, site_id, check_in, check_out, reason)
             SELECT id, work_date, employee_name, site_id, check_in, check_out, ?2
             FROM attendance WHERE {SUPERSEDED}
             ORDER BY id"
        ),
        params![SCOPE_SENTINEL, DEDUPE_REASON],
    )?;
    let deleted = conn.execute(
        &format!("DELETE FROM attendance WHERE {SUPERSEDED}"),
        params![SCOPE_SENTINEL],
    )?;
    debug_assert_eq!(copied, deleted);
    Ok(deleted)
}

#[cfg(test)]
#[path = "v007_attendance_scope_uniqueness_test.rs"]
mod tests;
