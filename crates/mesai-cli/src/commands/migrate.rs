//! Migrate command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common;

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::resolve_config(global)?;
    let target = args.target.or(config.target_version);
    let mut db = common::connect(&config)?;

    let report = db.migrate(target).context("Migration failed")?;
    if report.is_noop() {
        println!(
            "{}: already at v{:03}, nothing to apply",
            config.database.display(),
            report.to
        );
        return Ok(());
    }

    if global.verbose {
        for version in &report.applied {
            println!("  applied {version}");
        }
    }
    println!(
        "{}: migrated v{:03} -> v{:03} ({} step{})",
        config.database.display(),
        report.from,
        report.to,
        report.applied.len(),
        if report.applied.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
