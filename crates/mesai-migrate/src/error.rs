//! Error types for the migration engine.

use thiserror::Error;

/// Migration errors.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Failed to open or configure the database (MG001).
    #[error("[MG001] Database connection failed: {0}")]
    ConnectionError(String),

    /// A step expected a table that the database does not have (MG002).
    #[error("[MG002] Table not found: {table}")]
    TableNotFound { table: String },

    /// A step failed; the database stays at the previous version (MG003).
    #[error("[MG003] Migration v{version:03} ({name}) failed: {source}")]
    StepFailed {
        version: u32,
        name: &'static str,
        #[source]
        source: Box<MigrateError>,
    },

    /// The step list has a gap, a duplicate or is out of order (MG004).
    #[error("[MG004] Invalid migration registry: {0}")]
    InvalidRegistry(String),

    /// The database was migrated by a newer build (MG005).
    #[error("[MG005] Database is at v{current:03} but this build only knows up to v{latest:03}")]
    DatabaseAhead { current: u32, latest: u32 },

    /// Requested target version is not in the registry (MG006).
    #[error("[MG006] Unknown target version v{target:03} (latest is v{latest:03})")]
    UnknownVersion { target: u32, latest: u32 },

    /// The ledger records a version without all of its predecessors (MG007).
    #[error(
        "[MG007] Migration v{version:03} is missing but v{max_applied:03} was applied; \
         migrations must be applied sequentially"
    )]
    MissingVersion { version: u32, max_applied: u32 },

    /// Version ledger could not be read or written (MG008).
    #[error("[MG008] Version ledger error: {0}")]
    LedgerError(String),

    /// Config file not found (MG009).
    #[error("[MG009] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Config file could not be parsed or failed validation (MG010).
    #[error("[MG010] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// IO error with path context (MG011).
    #[error("[MG011] IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// SQLite driver error with preserved source chain (MG012).
    #[error("[MG012] SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl From<rusqlite::Error> for MigrateError {
    fn from(err: rusqlite::Error) -> Self {
        MigrateError::Sqlite(err)
    }
}

impl From<serde_yaml::Error> for MigrateError {
    fn from(err: serde_yaml::Error) -> Self {
        MigrateError::ConfigInvalid {
            message: err.to_string(),
        }
    }
}

impl MigrateError {
    /// The underlying SQLite error, if this error (or the step failure it
    /// wraps) originated in the driver.
    pub fn sqlite_error(&self) -> Option<&rusqlite::Error> {
        match self {
            MigrateError::Sqlite(err) => Some(err),
            MigrateError::StepFailed { source, .. } => source.sqlite_error(),
            _ => None,
        }
    }

    /// Version of the failed step, if this is a step failure.
    pub fn failed_version(&self) -> Option<u32> {
        match self {
            MigrateError::StepFailed { version, .. } => Some(*version),
            _ => None,
        }
    }
}
