//! Status command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common;

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::resolve_config(global)?;
    let db = common::connect(&config)?;
    let status = db.status().context("Failed to read migration status")?;

    if args.json {
        let output =
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?;
        println!("{output}");
        return Ok(());
    }

    println!("Database: {}", config.database.display());
    println!("Schema version: v{:03} (latest v{:03})", status.current, status.latest);

    if !status.applied.is_empty() {
        println!("\nApplied:");
        for applied in &status.applied {
            println!(
                "  v{:03}  {:<30} {}",
                applied.version, applied.name, applied.applied_at
            );
        }
    }

    if status.pending.is_empty() {
        println!("\nUp to date.");
    } else {
        println!("\nPending ({}):", status.pending.len());
        for step in &status.pending {
            println!("  {}  {:<30} {}", step.version, step.name, step.description);
        }
    }
    Ok(())
}
