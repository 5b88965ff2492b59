//! Steps command implementation

use anyhow::Result;
use mesai_migrate::Registry;

use crate::cli::{GlobalArgs, StepsArgs};

/// Execute the steps command
pub(crate) fn execute(_args: &StepsArgs, global: &GlobalArgs) -> Result<()> {
    let registry = Registry::builtin()?;
    println!("Migration steps ({}):\n", registry.steps().len());
    for step in registry.steps() {
        println!("  {}  {}", step.version, step.name);
        if global.verbose {
            println!("        {}", step.description);
        }
    }
    Ok(())
}
