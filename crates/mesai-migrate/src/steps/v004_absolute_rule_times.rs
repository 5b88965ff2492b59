//! v004: rule times become absolute hours of day.
//!
//! Rule rows used to store `start_time`/`end_time` as hours after the
//! reference start time (17:30 unless configured), and `overtime_rules`
//! stored the paid amount as `multiplier`. From this version on both tables
//! store absolute hours (`17.5` = 17:30) and `overtime_rules.payout` holds
//! `old end_time * multiplier`. The sibling `holiday_overtime_rules` only has
//! its times shifted.
//!
//! Nothing in the data records which convention a row uses, so rows are
//! classified per site: a site whose rules contain any time `>=`
//! [`ABSOLUTE_TIME_BOUNDARY`] is taken to be converted already and skipped as
//! a whole. Offsets are always below noon and absolute hours at or after
//! noon are not, which is what makes a second run a no-op. An offset of 12h
//! or more would be misread as already converted; the boundary is kept as is
//! until the real offset range is known.
//!
//! The same holds for the reference time. A site configured with a morning
//! start (say `08:00`) converts `0.5` to `8.5`, which is still below the
//! boundary: the group stays unclassified, a second run shifts it again and
//! overwrites `payout` with `end * 1`. The ledger keeps the step from running
//! twice; a ledger-free second run over such a site is not safe.

use crate::error::MigrateResult;
use crate::introspect::{column_exists, table_exists};
use crate::rebuild::{value_as_f64, RowError};
use crate::settings::{default_reference_time, site_reference_times, ReferenceTime};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashMap};

/// Times at or above this are treated as absolute hours of day.
///
/// Only correct while every reference time is at or after noon. Rows
/// converted against a morning reference stay below it and are converted
/// again on a second run.
pub const ABSOLUTE_TIME_BOUNDARY: f64 = 12.0;

struct RuleTable {
    name: &'static str,
    folds_multiplier: bool,
}

const RULE_TABLES: &[RuleTable] = &[
    RuleTable {
        name: "overtime_rules",
        folds_multiplier: true,
    },
    RuleTable {
        name: "holiday_overtime_rules",
        folds_multiplier: false,
    },
];

#[derive(Debug)]
struct RuleRow {
    id: i64,
    start: Value,
    end: Value,
    multiplier: Option<Value>,
}

/// New values for one rule row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AbsoluteTimes {
    pub start: f64,
    pub end: f64,
    /// Folded payout; `None` when the table keeps its payout.
    pub payout: Option<f64>,
}

/// Per-table counters, logged after conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConvertStats {
    pub converted: usize,
    pub skipped_rows: usize,
    pub skipped_groups: usize,
}

pub fn apply(conn: &Connection) -> MigrateResult<()> {
    let default = default_reference_time(conn)?;
    let overrides = site_reference_times(conn)?;
    for table in RULE_TABLES {
        let stats = convert_table(conn, table, default, &overrides)?;
        log::info!(
            "{}: {} rows converted, {} rows skipped, {} site groups already absolute",
            table.name,
            stats.converted,
            stats.skipped_rows,
            stats.skipped_groups
        );
    }
    Ok(())
}

fn convert_table(
    conn: &Connection,
    table: &RuleTable,
    default: ReferenceTime,
    overrides: &HashMap<i64, ReferenceTime>,
) -> MigrateResult<ConvertStats> {
    let mut stats = ConvertStats::default();
    if !table_exists(conn, table.name)? {
        log::debug!("{} does not exist; nothing to convert", table.name);
        return Ok(stats);
    }
    let site_expr = if column_exists(conn, table.name, "site_id")? {
        "site_id"
    } else {
        "NULL"
    };
    let folds = table.folds_multiplier && column_exists(conn, table.name, "multiplier")?;
    let multiplier_expr = if folds { "multiplier" } else { "NULL" };

    let mut groups: BTreeMap<Option<i64>, Vec<RuleRow>> = BTreeMap::new();
    {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, {site_expr}, start_time, end_time, {multiplier_expr} FROM {} ORDER BY id",
            table.name
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                scope_key(&row.get::<_, Value>(1)?),
                RuleRow {
                    id: row.get(0)?,
                    start: row.get(2)?,
                    end: row.get(3)?,
                    multiplier: folds.then(|| row.get(4)).transpose()?,
                },
            ))
        })?;
        for row in rows {
            let (site, rule) = row?;
            groups.entry(site).or_default().push(rule);
        }
    }

    let update_sql = if folds {
        format!(
            "UPDATE {} SET start_time = ?1, end_time = ?2, payout = ?3, multiplier = 1 WHERE id = ?4",
            table.name
        )
    } else {
        format!(
            "UPDATE {} SET start_time = ?1, end_time = ?2 WHERE id = ?3",
            table.name
        )
    };
    let mut update = conn.prepare(&update_sql)?;

    for (site, rules) in &groups {
        if group_is_absolute(rules.iter().flat_map(|r| [&r.start, &r.end])) {
            log::debug!("{}: site {site:?} already uses absolute times", table.name);
            stats.skipped_groups += 1;
            continue;
        }
        let reference = site
            .and_then(|id| overrides.get(&id).copied())
            .unwrap_or(default);

        for rule in rules {
            match reinterpret(&rule.start, &rule.end, rule.multiplier.as_ref(), reference) {
                Ok(AbsoluteTimes {
                    start,
                    end,
                    payout: Some(payout),
                }) => {
                    update.execute(params![start, end, payout, rule.id])?;
                }
                Ok(AbsoluteTimes { start, end, .. }) => {
                    update.execute(params![start, end, rule.id])?;
                }
                Err(err) => {
                    log::warn!("{} row {} left unchanged: {err}", table.name, rule.id);
                    stats.skipped_rows += 1;
                    continue;
                }
            }
            stats.converted += 1;
        }
    }
    Ok(stats)
}

/// Site id used for grouping. Anything that is not a whole number groups
/// with the rows that have no site.
fn scope_key(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// True if any parsable time in the group is at or past the boundary.
pub(crate) fn group_is_absolute<'a>(times: impl IntoIterator<Item = &'a Value>) -> bool {
    times
        .into_iter()
        .filter_map(value_as_f64)
        .any(|hours| hours >= ABSOLUTE_TIME_BOUNDARY)
}

/// Shift one row's offsets onto the reference time and, when a multiplier is
/// given, fold it into the payout as `end offset * multiplier`.
pub(crate) fn reinterpret(
    start: &Value,
    end: &Value,
    multiplier: Option<&Value>,
    reference: ReferenceTime,
) -> Result<AbsoluteTimes, RowError> {
    let start_offset =
        value_as_f64(start).ok_or_else(|| RowError::new(format!("start_time {start:?}")))?;
    let end_offset = value_as_f64(end).ok_or_else(|| RowError::new(format!("end_time {end:?}")))?;
    let payout = multiplier
        .map(|m| {
            value_as_f64(m)
                .map(|factor| end_offset * factor)
                .ok_or_else(|| RowError::new(format!("multiplier {m:?}")))
        })
        .transpose()?;

    let base = reference.hours();
    Ok(AbsoluteTimes {
        start: base + start_offset,
        end: base + end_offset,
        payout,
    })
}

#[cfg(test)]
#[path = "v004_absolute_rule_times_test.rs"]
mod tests;
