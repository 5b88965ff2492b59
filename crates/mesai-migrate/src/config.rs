//! Configuration for migration runs, read from `mesai.yml`.

use crate::error::{MigrateError, MigrateResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Migration configuration.
///
/// ```yaml
/// database: data/mesai.db
/// busy_timeout_ms: 5000
/// target_version: 7
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    /// Path to the SQLite database file, relative to the config file.
    pub database: PathBuf,

    /// How long to wait on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Stop after this version instead of migrating to the latest.
    #[serde(default)]
    pub target_version: Option<u32>,
}

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl MigrateConfig {
    /// Config for `database` with every other field at its default.
    pub fn for_database(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            target_version: None,
        }
    }

    /// Load configuration from a file path.
    ///
    /// A relative `database` path is resolved against the file's directory.
    pub fn load(path: &Path) -> MigrateResult<Self> {
        if !path.exists() {
            return Err(MigrateError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MigrateError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config: MigrateConfig = serde_yaml::from_str(&content)?;
        config.validate()?;

        if config.database.is_relative() {
            if let Some(dir) = path.parent() {
                config.database = dir.join(&config.database);
            }
        }
        Ok(config)
    }

    /// Load configuration from a directory.
    /// Looks for mesai.yml or mesai.yaml
    pub fn load_from_dir(dir: &Path) -> MigrateResult<Self> {
        let yml_path = dir.join("mesai.yml");
        let yaml_path = dir.join("mesai.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(MigrateError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Reject an empty database path and a zero target version.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.database.as_os_str().is_empty() {
            return Err(MigrateError::ConfigInvalid {
                message: "database path cannot be empty".to_string(),
            });
        }
        if self.target_version == Some(0) {
            return Err(MigrateError::ConfigInvalid {
                message: "target_version must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
