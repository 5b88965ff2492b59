//! Ledger-backed migration runs.
//!
//! Glues the core [`Registry`] to the default `schema_version` ledger: reads
//! the current version, refuses inconsistent ledgers, and records each
//! applied step inside that step's own transaction.

use crate::error::MigrateResult;
use crate::ledger::{self, AppliedVersion};
use crate::registry::Registry;
use crate::version::SchemaVersion;
use rusqlite::Connection;
use serde::Serialize;

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Version before the run.
    pub from: u32,
    /// Version after the run.
    pub to: u32,
    /// Versions applied by this run, ascending.
    pub applied: Vec<SchemaVersion>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Snapshot of where a database stands relative to the registry.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub current: u32,
    pub latest: u32,
    pub applied: Vec<AppliedVersion>,
    pub pending: Vec<PendingStep>,
}

/// A registered step not yet recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingStep {
    pub version: SchemaVersion,
    pub name: &'static str,
    pub description: &'static str,
}

/// Apply pending built-in steps up to `target` (latest when `None`),
/// recording each in `schema_version`.
pub fn run_migrations(conn: &mut Connection, target: Option<u32>) -> MigrateResult<MigrationReport> {
    run_registry(&Registry::builtin()?, conn, target)
}

/// [`run_migrations`] against an explicit registry.
pub fn run_registry(
    registry: &Registry,
    conn: &mut Connection,
    target: Option<u32>,
) -> MigrateResult<MigrationReport> {
    ledger::ensure_version_table(conn)?;
    ledger::verify_sequential(&ledger::applied_versions(conn)?)?;
    let from = ledger::current_version(conn)?;

    let mut applied = Vec::new();
    let to = registry.apply_through(conn, from, target, |tx, step| {
        ledger::record_applied(tx, step)?;
        applied.push(step.version);
        Ok(())
    })?;

    if applied.is_empty() {
        log::debug!("Schema is up to date at v{to:03}");
    }
    Ok(MigrationReport { from, to, applied })
}

/// Report applied and pending steps without changing anything but the
/// (idempotent) creation of the ledger table.
pub fn migration_status(conn: &Connection) -> MigrateResult<MigrationStatus> {
    let registry = Registry::builtin()?;
    ledger::ensure_version_table(conn)?;
    let applied = ledger::applied_versions(conn)?;
    let current = applied.last().map_or(0, |a| a.version);
    let pending = registry
        .pending(current)
        .iter()
        .map(|step| PendingStep {
            version: step.version,
            name: step.name,
            description: step.description,
        })
        .collect();
    Ok(MigrationStatus {
        current,
        latest: registry.latest(),
        applied,
        pending,
    })
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
