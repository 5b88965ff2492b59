//! Read-only queries against the SQLite catalog.
//!
//! Every step calls into this module before mutating anything. Nothing here
//! is cached: a step earlier in the same pass may have reshaped the table, so
//! each answer comes from the live catalog at the time of the call.
//!
//! Missing objects are answered with `false`, `None` or an empty list; only a
//! failing driver call (disk, corruption) surfaces as an error.

use crate::error::MigrateResult;
use rusqlite::{Connection, OptionalExtension};

/// Check whether a table exists in the main schema.
pub fn table_exists(conn: &Connection, table: &str) -> MigrateResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Check whether `table` has a column named `column`.
///
/// Returns `false` when the table itself does not exist.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> MigrateResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Column names of `table` in declaration order (empty if the table is absent).
pub fn table_columns(conn: &Connection, table: &str) -> MigrateResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// The `CREATE TABLE` text SQLite stored for `table`, if the table exists.
pub fn table_definition_sql(conn: &Connection, table: &str) -> MigrateResult<Option<String>> {
    let sql = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [table],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(sql.flatten())
}

/// Check whether an index with this name exists.
pub fn index_exists(conn: &Connection, index: &str) -> MigrateResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1 COLLATE NOCASE",
        [index],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Column lists of the inline `UNIQUE` constraints declared on `table`.
///
/// SQLite backs every inline uniqueness rule with an automatic index whose
/// `origin` is `u`; reading those through `pragma_index_list` /
/// `pragma_index_info` is a structural check that does not depend on how the
/// original `CREATE TABLE` text was formatted. Column names are lowercased.
pub fn unique_constraints(conn: &Connection, table: &str) -> MigrateResult<Vec<Vec<String>>> {
    let mut list = conn.prepare("SELECT name FROM pragma_index_list(?1) WHERE origin = 'u'")?;
    let index_names = list
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut info = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    let mut constraints = Vec::with_capacity(index_names.len());
    for index in &index_names {
        let columns = info
            .query_map([index], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|name| name.unwrap_or_default().to_lowercase())
            .collect();
        constraints.push(columns);
    }
    Ok(constraints)
}

/// Check whether `table` carries an inline `UNIQUE` constraint over exactly
/// `columns` (order-sensitive, case-insensitive).
pub fn has_unique_constraint(
    conn: &Connection,
    table: &str,
    columns: &[&str],
) -> MigrateResult<bool> {
    let wanted: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
    Ok(unique_constraints(conn, table)?
        .iter()
        .any(|existing| *existing == wanted))
}

/// Check whether the stored definition of `table` contains `fragment`.
///
/// Both sides are lowercased and stripped of whitespace outside string
/// literals before comparing, so `CHECK (amount >= 0)` matches
/// `check(amount>=0)` but `'Ek'` does not match `'ek'`. SQLite keeps the
/// `CREATE TABLE` text as written and exposes no structural view of `CHECK`
/// clauses, so this stays a textual match: a clause written with different
/// parenthesisation or quoting is not recognised. Returns `false` when the
/// table is absent.
pub fn definition_contains(conn: &Connection, table: &str, fragment: &str) -> MigrateResult<bool> {
    Ok(table_definition_sql(conn, table)?
        .map(|sql| normalize_sql(&sql).contains(&normalize_sql(fragment)))
        .unwrap_or(false))
}

/// Lowercase and drop whitespace outside `'...'` literals. Literals are kept
/// verbatim because SQLite compares text case-sensitively. A doubled `''`
/// inside a literal closes and reopens it, which leaves it intact.
fn normalize_sql(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    for c in sql.chars() {
        if c == '\'' {
            in_literal = !in_literal;
            out.push(c);
        } else if in_literal {
            out.push(c);
        } else if !c.is_whitespace() {
            out.extend(c.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
#[path = "introspect_test.rs"]
mod tests;
