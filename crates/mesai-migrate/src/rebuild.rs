//! Rebuild-and-swap: replace a table with a freshly created one of the final
//! shape.
//!
//! SQLite cannot drop a `CHECK`, remove an inline `UNIQUE`, or (portably)
//! drop a column in place. A [`Rebuild`] creates `<table>__shadow` with the
//! final definition, copies the rows whose columns exist in both shapes
//! (optionally passing each row through a transform), drops the original and
//! renames the shadow into its place.
//!
//! The rebuild runs on whatever connection the step was handed, which the
//! runner has already put inside a transaction, so all four statements commit
//! or roll back together. A rebuild that was interrupted outside a transaction
//! is resumed on the next call: "original missing, shadow present" finishes
//! the rename, "both present" discards the stale shadow and starts over.
//!
//! Indexes and triggers belonging to the original are dropped with it; the
//! calling step recreates whatever the final shape needs. The original's
//! `AUTOINCREMENT` high-water mark in `sqlite_sequence` is carried over, so
//! ids of rows deleted before the rebuild are never handed out again.

use crate::ddl::quote_ident;
use crate::error::{MigrateError, MigrateResult};
use crate::introspect::{table_columns, table_exists};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::fmt;

/// Suffix appended to a table name to form its shadow table.
pub const SHADOW_SUFFIX: &str = "__shadow";

/// A per-row transform failure. The row is copied unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError(pub String);

impl RowError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row on its way into the shadow table, keyed by shadow column names.
#[derive(Debug)]
pub struct ShadowRow<'a> {
    columns: &'a [String],
    values: Vec<Value>,
}

impl<'a> ShadowRow<'a> {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }

    /// Raw value of a copied column, `None` if the column is not copied.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|i| &self.values[i])
    }

    /// Text value of a column (`None` for NULL, non-text, or absent columns).
    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric value of a column, parsing text if necessary.
    pub fn real(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(value_as_f64)
    }

    /// Replace the value of a copied column.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<(), RowError> {
        let i = self
            .position(column)
            .ok_or_else(|| RowError::new(format!("column '{column}' is not copied")))?;
        self.values[i] = value.into();
        Ok(())
    }
}

/// Interpret a SQLite value as a finite number.
///
/// Integers and reals pass through; text is trimmed and parsed. NULL, blobs,
/// unparsable text and non-finite results yield `None`.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Integer(i) => *i as f64,
        Value::Real(f) => *f,
        Value::Text(s) => s.trim().parse::<f64>().ok()?,
        Value::Null | Value::Blob(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Counters reported by a finished rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Rows written into the new table.
    pub copied: usize,
    /// Rows whose transform failed and were copied unchanged.
    pub untransformed: usize,
    /// The call only finished a previously interrupted swap.
    pub resumed: bool,
}

/// A planned rebuild of one table.
#[derive(Debug, Clone)]
pub struct Rebuild<'a> {
    table: &'a str,
    definition: &'a str,
    renames: Vec<(&'a str, &'a str)>,
}

impl<'a> Rebuild<'a> {
    /// Plan a rebuild of `table` into the shape given by `definition` (the
    /// column and constraint list that goes between the parentheses of
    /// `CREATE TABLE`).
    pub fn new(table: &'a str, definition: &'a str) -> Self {
        Self {
            table,
            definition,
            renames: Vec::new(),
        }
    }

    /// Copy values of the original's `from` column into the new `to` column.
    pub fn rename_column(mut self, from: &'a str, to: &'a str) -> Self {
        self.renames.push((from, to));
        self
    }

    /// Name of the shadow table used while rebuilding `table`.
    pub fn shadow_name_for(table: &str) -> String {
        format!("{table}{SHADOW_SUFFIX}")
    }

    /// Rebuild with a straight structural copy.
    pub fn run(self, conn: &Connection) -> MigrateResult<RebuildStats> {
        self.run_with(conn, |_| Ok(()))
    }

    /// Rebuild, passing every copied row through `transform`.
    ///
    /// A transform error is a per-row failure: it is logged and the row is
    /// copied with its original values. A row that then violates the new
    /// table's constraints fails the whole rebuild.
    pub fn run_with<F>(self, conn: &Connection, mut transform: F) -> MigrateResult<RebuildStats>
    where
        F: FnMut(&mut ShadowRow<'_>) -> Result<(), RowError>,
    {
        let table = self.table;
        let shadow = Self::shadow_name_for(table);

        match (table_exists(conn, table)?, table_exists(conn, &shadow)?) {
            (false, true) => {
                log::warn!("Resuming interrupted rebuild of {table}: renaming {shadow}");
                swap_in(conn, &shadow, table)?;
                return Ok(RebuildStats {
                    resumed: true,
                    ..RebuildStats::default()
                });
            }
            (false, false) => {
                return Err(MigrateError::TableNotFound {
                    table: table.to_string(),
                })
            }
            (true, true) => {
                log::warn!("Dropping stale shadow table {shadow}");
                conn.execute_batch(&format!("DROP TABLE {}", quote_ident(&shadow)))?;
            }
            (true, false) => {}
        }

        conn.execute_batch(&format!(
            "CREATE TABLE {} ({})",
            quote_ident(&shadow),
            self.definition
        ))?;

        let source_columns = table_columns(conn, table)?;
        let shadow_columns = table_columns(conn, &shadow)?;
        let (sources, targets) = self.copy_plan(&source_columns, &shadow_columns);

        let mut stats = RebuildStats::default();
        if targets.is_empty() {
            log::warn!("Rebuild of {table}: no columns in common with the new shape");
        } else {
            let select_sql = format!(
                "SELECT {} FROM {}",
                sources
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", "),
                quote_ident(table)
            );
            let width = sources.len();
            let rows: Vec<Vec<Value>> = conn
                .prepare(&select_sql)?
                .query_map([], |row| {
                    (0..width)
                        .map(|i| row.get::<_, Value>(i))
                        .collect::<Result<Vec<_>, _>>()
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let insert_sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&shadow),
                targets
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", "),
                (1..=width)
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let mut insert = conn.prepare(&insert_sql)?;

            for values in rows {
                let mut row = ShadowRow {
                    columns: &targets,
                    values,
                };
                let original = row.values.clone();
                if let Err(err) = transform(&mut row) {
                    log::warn!("Rebuild of {table}: row copied untransformed: {err}");
                    row.values = original;
                    stats.untransformed += 1;
                }
                insert.execute(params_from_iter(row.values.iter()))?;
                stats.copied += 1;
            }
        }

        let high_water = sequence_value(conn, table)?;
        conn.execute_batch(&format!("DROP TABLE {}", quote_ident(table)))?;
        swap_in(conn, &shadow, table)?;
        if let Some(seq) = high_water {
            restore_sequence(conn, table, seq)?;
        }

        log::debug!(
            "Rebuilt {table}: {} rows copied, {} untransformed",
            stats.copied,
            stats.untransformed
        );
        Ok(stats)
    }

    /// Pair each shadow column with the original column it is copied from.
    ///
    /// A shadow column is filled from the same-named original column, or from
    /// the `from` side of a rename. Shadow columns with no source keep their
    /// declared default.
    fn copy_plan(&self, source: &[String], shadow: &[String]) -> (Vec<String>, Vec<String>) {
        let has = |name: &str| source.iter().any(|c| c.eq_ignore_ascii_case(name));
        shadow
            .iter()
            .filter_map(|target| {
                if has(target) {
                    return Some((target.clone(), target.clone()));
                }
                self.renames
                    .iter()
                    .find(|(from, to)| to.eq_ignore_ascii_case(target) && has(from))
                    .map(|(from, _)| (from.to_string(), target.clone()))
            })
            .unzip()
    }
}

/// `sqlite_sequence.seq` for `table`, if it has ever issued an
/// `AUTOINCREMENT` id.
fn sequence_value(conn: &Connection, table: &str) -> MigrateResult<Option<i64>> {
    if !table_exists(conn, "sqlite_sequence")? {
        return Ok(None);
    }
    let seq = conn
        .query_row(
            "SELECT seq FROM sqlite_sequence WHERE name = ?1 COLLATE NOCASE",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(seq)
}

/// Raise the sequence of the swapped-in table to at least `seq`.
fn restore_sequence(conn: &Connection, table: &str, seq: i64) -> MigrateResult<()> {
    let raised = conn.execute(
        "UPDATE sqlite_sequence SET seq = MAX(seq, ?2) WHERE name = ?1 COLLATE NOCASE",
        params![table, seq],
    )?;
    if raised == 0 {
        conn.execute(
            "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2)",
            params![table, seq],
        )?;
    }
    Ok(())
}

fn swap_in(conn: &Connection, shadow: &str, table: &str) -> MigrateResult<()> {
    conn.execute_batch(&format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_ident(shadow),
        quote_ident(table)
    ))?;
    Ok(())
}

#[cfg(test)]
#[path = "rebuild_test.rs"]
mod tests;
