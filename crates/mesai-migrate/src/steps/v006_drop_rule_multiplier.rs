//! v006: drop `overtime_rules.multiplier`.
//!
//! v004 folds the multiplier into `payout` and resets it to 1, but it leaves
//! rows alone that it could not parse or whose site group already looked
//! absolute. Those rows may still carry a real multiplier, so before the
//! column goes every row whose multiplier is not 1 is copied into
//! [`AUDIT_TABLE`] together with the rule it belonged to. The rule rows
//! themselves stay in place.
//!
//! SQLite's `DROP COLUMN` is not available on every build we ship against, so
//! the table is rebuilt.

use crate::error::MigrateResult;
use crate::introspect::{column_exists, table_exists};
use crate::rebuild::Rebuild;
use rusqlite::{params, Connection};

const TABLE: &str = "overtime_rules";
const COLUMN: &str = "multiplier";

/// Table receiving multipliers that were never folded into a payout.
pub const AUDIT_TABLE: &str = "overtime_rule_multiplier_audit";

/// `reason` recorded for multipliers preserved by this step.
pub const PRESERVE_REASON: &str = "v006_drop_rule_multiplier";

const DEFINITION: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER,
    start_time REAL NOT NULL,
    end_time REAL NOT NULL,
    payout REAL NOT NULL DEFAULT 0";

const AUDIT_DDL: &str = "CREATE TABLE IF NOT EXISTS overtime_rule_multiplier_audit (
    audit_id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_id INTEGER NOT NULL,
    site_id INTEGER,
    start_time,
    end_time,
    payout,
    multiplier,
    reason TEXT NOT NULL,
    preserved_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

pub fn apply(conn: &Connection) -> MigrateResult<()> {
    let interrupted = table_exists(conn, &Rebuild::shadow_name_for(TABLE))?;
    let has_column = column_exists(conn, TABLE, COLUMN)?;
    if !interrupted && !has_column {
        log::debug!("{TABLE}.{COLUMN} already gone");
        return Ok(());
    }

    if has_column {
        let preserved = preserve_unfolded(conn)?;
        if preserved > 0 {
            log::warn!(
                "{preserved} {TABLE} rows still had a multiplier other than 1; copied to {AUDIT_TABLE}"
            );
        }
    }

    let stats = Rebuild::new(TABLE, DEFINITION).run(conn)?;
    log::info!("Dropped {TABLE}.{COLUMN}: {} rows kept", stats.copied);
    Ok(())
}

/// Copy every rule whose multiplier was not folded into the audit table.
/// Rules already recorded there are not copied twice.
fn preserve_unfolded(conn: &Connection) -> MigrateResult<usize> {
    conn.execute_batch(AUDIT_DDL)?;
    let site_expr = if column_exists(conn, TABLE, "site_id")? {
        "site_id"
    } else {
        "NULL"
    };
    let copied = conn.execute(
        &format!(
            "INSERT INTO {AUDIT_TABLE}
                 (rule_id, site_id, start_time, end_time, payout, multiplier, reason)
             SELECT id, {site_expr}, start_time, end_time, payout, multiplier, ?1
             FROM {TABLE}
             WHERE multiplier IS NOT 1
               AND NOT EXISTS (
                   SELECT 1 FROM {AUDIT_TABLE} a
                   WHERE a.rule_id = {TABLE}.id AND a.reason = ?1
               )
             ORDER BY id"
        ),
        params![PRESERVE_REASON],
    )?;
    Ok(copied)
}

#[cfg(test)]
#[path = "v006_drop_rule_multiplier_test.rs"]
mod tests;
