//! Database connection wrapper.
//!
//! [`MesaiDb`] owns the single SQLite [`Connection`] used for a migration
//! pass and provides helpers for opening, migrating and inspecting it.

use crate::config::MigrateConfig;
use crate::error::{MigrateError, MigrateResult};
use crate::migration::{migration_status, run_migrations, MigrationReport, MigrationStatus};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Wrapper around the application's SQLite database.
///
/// Single-threaded: a migration pass assumes exclusive ownership of the
/// connection and no concurrent writers.
pub struct MesaiDb {
    conn: Connection,
}

impl MesaiDb {
    /// Open (or create) the database at `path` and migrate it to the latest
    /// version.
    pub fn open(path: &Path) -> MigrateResult<Self> {
        let mut db = Self::connect(path, Duration::from_secs(5))?;
        db.migrate(None)?;
        Ok(db)
    }

    /// Create an in-memory database with all migrations applied.
    ///
    /// Useful for unit tests that don't need persistence.
    pub fn open_memory() -> MigrateResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MigrateError::ConnectionError(e.to_string()))?;
        let mut db = Self { conn };
        db.migrate(None)?;
        Ok(db)
    }

    /// Open (or create) the database at `path` without migrating it.
    pub fn connect(path: &Path, busy_timeout: Duration) -> MigrateResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| MigrateError::ConnectionError(format!("{e}: {}", path.display())))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| MigrateError::ConnectionError(format!("busy_timeout: {e}")))?;
        Ok(Self { conn })
    }

    /// Open the database named by `config` without migrating it.
    pub fn connect_with_config(config: &MigrateConfig) -> MigrateResult<Self> {
        Self::connect(&config.database, config.busy_timeout())
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Apply pending migrations up to `target` (latest when `None`).
    pub fn migrate(&mut self, target: Option<u32>) -> MigrateResult<MigrationReport> {
        run_migrations(&mut self.conn, target)
    }

    /// Where the database stands relative to the built-in steps.
    pub fn status(&self) -> MigrateResult<MigrationStatus> {
        migration_status(&self.conn)
    }

    /// Borrow the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Give up the wrapper and return the connection.
    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
