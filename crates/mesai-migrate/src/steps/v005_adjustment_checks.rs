//! v005: adjustment category and amount checks.
//!
//! `adjustments.category` must be `Ek` (addition) or `Kesinti` (deduction)
//! and `amount` a non-negative magnitude; the category carries the sign.
//! Existing rows are coerced rather than quarantined: categories are matched
//! case-insensitively, anything blank or unknown becomes `Kesinti`, negative
//! amounts become their absolute value and missing ones `0`.

use crate::error::MigrateResult;
use crate::introspect::definition_contains;
use crate::rebuild::{value_as_f64, Rebuild, RowError, ShadowRow};
use rusqlite::Connection;

const TABLE: &str = "adjustments";

/// Categories allowed after this step.
pub const CATEGORIES: &[&str] = &["Ek", "Kesinti"];

/// Category given to rows whose category is blank or unrecognised.
pub const FALLBACK_CATEGORY: &str = "Kesinti";

const CATEGORY_CHECK: &str = "CHECK (category IN ('Ek', 'Kesinti'))";
const AMOUNT_CHECK: &str = "CHECK (amount >= 0)";

const DEFINITION: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_name TEXT NOT NULL,
    work_date TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'Kesinti' CHECK (category IN ('Ek', 'Kesinti')),
    amount REAL NOT NULL DEFAULT 0 CHECK (amount >= 0),
    note TEXT";

pub fn apply(conn: &Connection) -> MigrateResult<()> {
    if definition_contains(conn, TABLE, CATEGORY_CHECK)?
        && definition_contains(conn, TABLE, AMOUNT_CHECK)?
    {
        log::debug!("{TABLE} already enforces category and amount checks");
        return Ok(());
    }

    let mut coerced = 0usize;
    let stats = Rebuild::new(TABLE, DEFINITION).run_with(conn, |row| {
        if coerce_row(row)? {
            coerced += 1;
        }
        Ok(())
    })?;
    log::info!(
        "Rebuilt {TABLE} with checks: {} rows, {coerced} coerced",
        stats.copied
    );
    Ok(())
}

/// Coerce one row into the checked domain; returns whether anything changed.
fn coerce_row(row: &mut ShadowRow<'_>) -> Result<bool, RowError> {
    let mut changed = false;

    let raw_category = row.text("category").map(str::to_owned);
    let category = coerce_category(raw_category.as_deref());
    if raw_category.as_deref() != Some(category) {
        row.set("category", category.to_string())?;
        changed = true;
    }

    let raw_amount = row.get("amount").cloned();
    let amount = coerce_amount(raw_amount.as_ref().and_then(value_as_f64));
    if raw_amount.as_ref().and_then(value_as_f64) != Some(amount) {
        row.set("amount", amount)?;
        changed = true;
    }
    Ok(changed)
}

/// Map a stored category onto [`CATEGORIES`].
pub(crate) fn coerce_category(raw: Option<&str>) -> &'static str {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(trimmed))
        .copied()
        .unwrap_or(FALLBACK_CATEGORY)
}

/// Map a stored amount onto a non-negative magnitude.
pub(crate) fn coerce_amount(raw: Option<f64>) -> f64 {
    raw.map_or(0.0, f64::abs)
}

#[cfg(test)]
#[path = "v005_adjustment_checks_test.rs"]
mod tests;
