//! Reusable idempotent DDL building blocks used by the steps.
//!
//! - [`add_column_if_missing`]: the additive-column pattern
//! - [`create_or_repair`]: create a table, or repair one still carrying a
//!   superseded column name

use crate::error::{MigrateError, MigrateResult};
use crate::introspect::{column_exists, table_columns, table_exists};
use crate::rebuild::Rebuild;
use rusqlite::Connection;

/// Quote an identifier for interpolation into DDL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Add `column` to `table` unless it is already there.
///
/// `declaration` is everything after the column name in
/// `ALTER TABLE ... ADD COLUMN`, e.g. `"INTEGER"` or `"TEXT NOT NULL DEFAULT ''"`.
/// Returns whether the column was added. The table must already exist; a
/// missing table is reported as [`MigrateError::TableNotFound`].
pub fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    declaration: &str,
) -> MigrateResult<bool> {
    if !table_exists(conn, table)? {
        return Err(MigrateError::TableNotFound {
            table: table.to_string(),
        });
    }
    if column_exists(conn, table, column)? {
        log::debug!("{table}.{column} already present");
        return Ok(false);
    }
    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_ident(table),
        quote_ident(column),
        declaration
    ))?;
    Ok(true)
}

/// A column whose name was superseded without changing what it stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRename<'a> {
    pub legacy: &'a str,
    pub current: &'a str,
}

/// What [`create_or_repair`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The table did not exist and was created with the final shape.
    Created,
    /// The table already had the final column names.
    Unchanged,
    /// The table was rebuilt to carry legacy column values under new names.
    Repaired,
}

/// Bring `table` to the shape given by `definition`.
///
/// The column set is read once and the decision branches on it:
/// absent table → create; every `current` name present (or no `legacy` name
/// present) → no-op; a `legacy` name present without its `current` name →
/// rebuild-and-swap copying the legacy values into the new column. Columns
/// are never renamed in place.
pub fn create_or_repair(
    conn: &Connection,
    table: &str,
    definition: &str,
    renames: &[ColumnRename<'_>],
) -> MigrateResult<RepairOutcome> {
    let columns = table_columns(conn, table)?;

    if columns.is_empty() {
        if table_exists(conn, &Rebuild::shadow_name_for(table))? {
            Rebuild::new(table, definition).run(conn)?;
            return Ok(RepairOutcome::Repaired);
        }
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(table),
            definition
        ))?;
        return Ok(RepairOutcome::Created);
    }

    let has = |name: &str| columns.iter().any(|c| c.eq_ignore_ascii_case(name));
    let stale: Vec<&ColumnRename<'_>> = renames
        .iter()
        .filter(|r| has(r.legacy) && !has(r.current))
        .collect();
    if stale.is_empty() {
        return Ok(RepairOutcome::Unchanged);
    }

    let rebuild = stale
        .iter()
        .fold(Rebuild::new(table, definition), |rebuild, r| {
            rebuild.rename_column(r.legacy, r.current)
        });
    let stats = rebuild.run(conn)?;
    log::info!(
        "Repaired {table}: {} rows carried over to renamed columns",
        stats.copied
    );
    Ok(RepairOutcome::Repaired)
}

#[cfg(test)]
#[path = "ddl_test.rs"]
mod tests;
