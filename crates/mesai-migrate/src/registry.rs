//! The ordered step registry and the core runner.
//!
//! A [`Registry`] is validated when it is built: versions must start at 1 and
//! be dense and strictly ascending. [`Registry::apply_through`] applies every
//! step above the caller's current version, one transaction per step, and
//! never starts step N+1 before step N has committed.

use crate::error::{MigrateError, MigrateResult};
use crate::steps::STEPS;
use crate::version::SchemaVersion;
use rusqlite::Connection;
use std::fmt;

/// A single idempotent, versioned schema/data change.
///
/// `apply` receives a connection that is already inside the step's
/// transaction. It must verify the live schema before mutating, must not
/// open transactions of its own, and propagates driver errors unchanged.
pub struct Step {
    pub version: SchemaVersion,
    pub name: &'static str,
    pub description: &'static str,
    pub apply: fn(&Connection) -> MigrateResult<()>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish()
    }
}

/// A validated, version-ordered list of steps.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    steps: &'static [Step],
}

impl Registry {
    /// Validate `steps` and wrap them.
    pub fn new(steps: &'static [Step]) -> MigrateResult<Self> {
        for (i, step) in steps.iter().enumerate() {
            let expected = i as u32 + 1;
            if step.version.get() != expected {
                let problem = match steps[..i].iter().find(|s| s.version == step.version) {
                    Some(prev) => format!(
                        "{} is used by both '{}' and '{}'",
                        step.version, prev.name, step.name
                    ),
                    None => format!(
                        "expected v{expected:03} at position {}, found {} ('{}')",
                        i + 1,
                        step.version,
                        step.name
                    ),
                };
                return Err(MigrateError::InvalidRegistry(problem));
            }
        }
        Ok(Self { steps })
    }

    /// The steps shipped with this crate.
    pub fn builtin() -> MigrateResult<Self> {
        Self::new(STEPS)
    }

    /// All steps in version order.
    pub fn steps(&self) -> &'static [Step] {
        self.steps
    }

    /// Highest known version (0 for an empty registry).
    pub fn latest(&self) -> u32 {
        self.steps.last().map_or(0, |s| s.version.get())
    }

    /// Look up a step by version.
    pub fn get(&self, version: u32) -> Option<&'static Step> {
        let index = version.checked_sub(1)? as usize;
        self.steps.get(index)
    }

    /// Steps above `current`, in order.
    pub fn pending(&self, current: u32) -> &'static [Step] {
        let start = (current as usize).min(self.steps.len());
        &self.steps[start..]
    }

    /// Apply every step above `current_version`; returns the new version.
    ///
    /// Persists nothing beyond what the steps themselves do.
    pub fn apply_pending(&self, conn: &mut Connection, current_version: u32) -> MigrateResult<u32> {
        self.apply_through(conn, current_version, None, |_, _| Ok(()))
    }

    /// Apply steps above `current_version` up to and including `target`
    /// (latest when `None`).
    ///
    /// Each step runs in its own transaction. `record` is called inside that
    /// transaction after the step succeeded, so a ledger write commits
    /// atomically with the step it records. On failure the transaction is
    /// rolled back and the error names the failing version; later steps do
    /// not run.
    pub fn apply_through<F>(
        &self,
        conn: &mut Connection,
        current_version: u32,
        target: Option<u32>,
        mut record: F,
    ) -> MigrateResult<u32>
    where
        F: FnMut(&Connection, &Step) -> MigrateResult<()>,
    {
        let latest = self.latest();
        if current_version > latest {
            return Err(MigrateError::DatabaseAhead {
                current: current_version,
                latest,
            });
        }
        let target = target.unwrap_or(latest);
        if target > latest {
            return Err(MigrateError::UnknownVersion { target, latest });
        }
        if target < current_version {
            log::warn!(
                "Target v{target:03} is below current v{current_version:03}; downgrades are not supported"
            );
            return Ok(current_version);
        }

        let mut applied = current_version;
        for step in self.pending(current_version) {
            if step.version.get() > target {
                break;
            }
            log::debug!("Applying migration {} ({})", step.version, step.name);
            let fail = |source: MigrateError| MigrateError::StepFailed {
                version: step.version.get(),
                name: step.name,
                source: Box::new(source),
            };

            let tx = conn.transaction().map_err(|e| fail(e.into()))?;
            (step.apply)(&tx).map_err(fail)?;
            record(&tx, step).map_err(fail)?;
            tx.commit().map_err(|e| fail(e.into()))?;

            log::info!("Applied migration {} {}", step.version, step.name);
            applied = step.version.get();
        }
        Ok(applied)
    }
}

/// Apply all built-in steps above `current_version` and return the new
/// version. The caller owns the ledger.
pub fn apply_pending(conn: &mut Connection, current_version: u32) -> MigrateResult<u32> {
    Registry::builtin()?.apply_pending(conn, current_version)
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
