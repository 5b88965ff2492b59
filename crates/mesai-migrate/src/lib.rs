//! Schema and data migrations for the mesai attendance database.
//!
//! The engine is a fixed, version-numbered list of idempotent [`Step`]s held in
//! a [`Registry`]. Each step re-derives what work remains from the live SQLite
//! catalog ([`introspect`]) and then performs additive DDL, a table
//! rebuild-and-swap ([`rebuild`]), or a guarded bulk data rewrite.
//!
//! [`apply_pending`] is the ledger-free entry point; [`MesaiDb`] and
//! [`migration::run_migrations`] add the default `schema_version` ledger.

pub mod config;
pub mod connection;
pub mod ddl;
pub mod error;
pub mod introspect;
pub mod ledger;
pub mod migration;
pub mod rebuild;
pub mod registry;
pub mod settings;
pub mod steps;
pub mod version;

pub use config::MigrateConfig;
pub use connection::MesaiDb;
pub use error::{MigrateError, MigrateResult};
pub use migration::{MigrationReport, MigrationStatus};
pub use registry::{apply_pending, Registry, Step};
pub use version::SchemaVersion;
