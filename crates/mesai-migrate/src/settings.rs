//! Reference start-of-shift time lookups.
//!
//! The process-wide reference time lives in the `settings` key/value table
//! under [`REFERENCE_START_TIME_KEY`]; a site may override it through
//! `sites.reference_start_time`. Every lookup here treats a missing table,
//! column, row or an unparsable value as "use the fallback" and never fails a
//! migration for it.

use crate::error::MigrateResult;
use crate::introspect::{column_exists, table_exists};
use chrono::{NaiveTime, Timelike};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt;

/// `settings.key` holding the default reference time as `"HH:MM"`.
pub const REFERENCE_START_TIME_KEY: &str = "reference_start_time";

/// Used when no (valid) reference time is configured.
pub const FALLBACK_REFERENCE_TIME: ReferenceTime = ReferenceTime::from_minutes(17 * 60 + 30);

/// A time of day expressed in whole minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceTime {
    minutes: u32,
}

impl ReferenceTime {
    const fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    /// Parse an `"HH:MM"` string (surrounding whitespace ignored).
    pub fn parse(text: &str) -> Option<Self> {
        let time = NaiveTime::parse_from_str(text.trim(), "%H:%M").ok()?;
        Some(Self::from_minutes(time.hour() * 60 + time.minute()))
    }

    /// The time as fractional hours, e.g. 17:30 → 17.5.
    pub fn hours(self) -> f64 {
        f64::from(self.minutes) / 60.0
    }
}

impl Default for ReferenceTime {
    fn default() -> Self {
        FALLBACK_REFERENCE_TIME
    }
}

impl fmt::Display for ReferenceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// Read the process-wide reference time, falling back to
/// [`FALLBACK_REFERENCE_TIME`].
pub fn default_reference_time(conn: &Connection) -> MigrateResult<ReferenceTime> {
    if !table_exists(conn, "settings")? {
        return Ok(FALLBACK_REFERENCE_TIME);
    }
    let raw: Option<Value> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            [REFERENCE_START_TIME_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        None | Some(Value::Null) => Ok(FALLBACK_REFERENCE_TIME),
        Some(value) => {
            let parsed = match &value {
                Value::Text(text) => ReferenceTime::parse(text),
                _ => None,
            };
            Ok(parsed.unwrap_or_else(|| {
                log::warn!(
                    "settings.{REFERENCE_START_TIME_KEY} = {value:?} is not HH:MM; using {FALLBACK_REFERENCE_TIME}"
                );
                FALLBACK_REFERENCE_TIME
            }))
        }
    }
}

/// Read per-site reference time overrides keyed by `sites.id`.
///
/// Sites with no or an unparsable override are left out, so callers fall
/// back to the default for them.
pub fn site_reference_times(conn: &Connection) -> MigrateResult<HashMap<i64, ReferenceTime>> {
    let mut overrides = HashMap::new();
    if !column_exists(conn, "sites", "reference_start_time")? {
        return Ok(overrides);
    }

    let mut stmt = conn.prepare(
        "SELECT id, reference_start_time FROM sites WHERE reference_start_time IS NOT NULL",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Value>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (site_id, value) in rows {
        let parsed = match &value {
            Value::Text(text) => ReferenceTime::parse(text),
            _ => None,
        };
        match parsed {
            Some(time) => {
                overrides.insert(site_id, time);
            }
            None => log::warn!(
                "sites.reference_start_time for site {site_id} is not HH:MM ({value:?}); using default"
            ),
        }
    }
    Ok(overrides)
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
