//! Default version ledger: the `schema_version` table.
//!
//! The migration core only needs "current version" and "record version N";
//! this is the stock implementation used by [`crate::MesaiDb`] and the CLI.

use crate::error::{MigrateError, MigrateResult};
use crate::registry::Step;
use rusqlite::Connection;
use serde::Serialize;

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedVersion {
    pub version: u32,
    pub name: String,
    pub applied_at: String,
}

/// Ensure the `schema_version` table exists.
pub fn ensure_version_table(conn: &Connection) -> MigrateResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version    INTEGER PRIMARY KEY,
             name       TEXT NOT NULL,
             applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
         );",
    )
    .map_err(|e| MigrateError::LedgerError(format!("failed to create schema_version table: {e}")))?;
    Ok(())
}

/// Return the highest recorded version, or 0 if none.
pub fn current_version(conn: &Connection) -> MigrateResult<u32> {
    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| MigrateError::LedgerError(format!("failed to read schema version: {e}")))?;
    Ok(version)
}

/// All recorded versions in ascending order.
pub fn applied_versions(conn: &Connection) -> MigrateResult<Vec<AppliedVersion>> {
    let read = || -> rusqlite::Result<Vec<AppliedVersion>> {
        let mut stmt =
            conn.prepare("SELECT version, name, applied_at FROM schema_version ORDER BY version")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AppliedVersion {
                    version: row.get(0)?,
                    name: row.get(1)?,
                    applied_at: row.get(2)?,
                })
            })?
            .collect();
        rows
    };
    read().map_err(|e| MigrateError::LedgerError(format!("failed to list applied versions: {e}")))
}

/// Record `step` as applied.
pub fn record_applied(conn: &Connection, step: &Step) -> MigrateResult<()> {
    conn.execute(
        "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
        rusqlite::params![step.version.get(), step.name],
    )
    .map_err(|e| {
        MigrateError::LedgerError(format!("failed to record migration {}: {e}", step.version))
    })?;
    Ok(())
}

/// Check that the recorded versions are exactly `1..=max`.
pub fn verify_sequential(applied: &[AppliedVersion]) -> MigrateResult<()> {
    let max_applied = applied.last().map_or(0, |a| a.version);
    for (i, entry) in applied.iter().enumerate() {
        let expected = i as u32 + 1;
        if entry.version != expected {
            return Err(MigrateError::MissingVersion {
                version: expected,
                max_applied,
            });
        }
    }
    Ok(())
}
