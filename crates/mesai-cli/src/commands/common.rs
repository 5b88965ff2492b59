//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use mesai_migrate::{MesaiDb, MigrateConfig, MigrateError};
use std::path::Path;

use crate::cli::GlobalArgs;

/// Resolve the migration config from the global flags.
///
/// `--config` names a file explicitly; otherwise `mesai.yml` in the current
/// directory is used if present. `--database` overrides the file's path and
/// is enough on its own when there is no config file.
pub(crate) fn resolve_config(global: &GlobalArgs) -> Result<MigrateConfig> {
    let loaded = match &global.config {
        Some(path) => Some(
            MigrateConfig::load(Path::new(path))
                .with_context(|| format!("Failed to load config from {path}"))?,
        ),
        None => match MigrateConfig::load_from_dir(Path::new(".")) {
            Ok(config) => Some(config),
            Err(MigrateError::ConfigNotFound { .. }) => None,
            Err(e) => return Err(e).context("Failed to load mesai.yml"),
        },
    };

    let config = match (loaded, &global.database) {
        (Some(mut config), Some(database)) => {
            config.database = database.into();
            config
        }
        (Some(config), None) => config,
        (None, Some(database)) => MigrateConfig::for_database(database),
        (None, None) => anyhow::bail!(
            "No database given: pass --database or create mesai.yml with a `database:` entry"
        ),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Open the configured database without migrating it.
pub(crate) fn connect(config: &MigrateConfig) -> Result<MesaiDb> {
    MesaiDb::connect_with_config(config)
        .with_context(|| format!("Failed to open database {}", config.database.display()))
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
