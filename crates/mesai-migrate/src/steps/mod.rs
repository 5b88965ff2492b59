//! The built-in migration steps, in version order.
//!
//! | v | step | pattern |
//! |---|------|---------|
//! | 1 | [`v001_initial_schema`] | base tables |
//! | 2 | [`v002_scope_columns`] | additive columns |
//! | 3 | [`v003_sites`] | create or repair |
//! | 4 | [`v004_absolute_rule_times`] | guarded data reinterpretation |
//! | 5 | [`v005_adjustment_checks`] | constraint tightening with coercion |
//! | 6 | [`v006_drop_rule_multiplier`] | column removal by rebuild |
//! | 7 | [`v007_attendance_scope_uniqueness`] | uniqueness widening with dedupe |

pub mod v001_initial_schema;
pub mod v002_scope_columns;
pub mod v003_sites;
pub mod v004_absolute_rule_times;
pub mod v005_adjustment_checks;
pub mod v006_drop_rule_multiplier;
pub mod v007_attendance_scope_uniqueness;

use crate::registry::Step;
use crate::version::SchemaVersion;

/// All built-in steps, ordered by version. Validated by
/// [`crate::Registry::builtin`].
pub static STEPS: &[Step] = &[
    Step {
        version: SchemaVersion::new(1),
        name: "initial_schema",
        description: "Create the base attendance, adjustment, rule and settings tables",
        apply: v001_initial_schema::apply,
    },
    Step {
        version: SchemaVersion::new(2),
        name: "scope_columns",
        description: "Add site_id scope columns and adjustment notes",
        apply: v002_scope_columns::apply,
    },
    Step {
        version: SchemaVersion::new(3),
        name: "sites",
        description: "Create the sites table or rename shift_start to reference_start_time",
        apply: v003_sites::apply,
    },
    Step {
        version: SchemaVersion::new(4),
        name: "absolute_rule_times",
        description: "Convert rule offsets to absolute hours and fold multipliers into payouts",
        apply: v004_absolute_rule_times::apply,
    },
    Step {
        version: SchemaVersion::new(5),
        name: "adjustment_checks",
        description: "Enforce adjustment category and non-negative amount, coercing old rows",
        apply: v005_adjustment_checks::apply,
    },
    Step {
        version: SchemaVersion::new(6),
        name: "drop_rule_multiplier",
        description: "Remove the folded overtime_rules.multiplier column",
        apply: v006_drop_rule_multiplier::apply,
    },
    Step {
        version: SchemaVersion::new(7),
        name: "attendance_scope_uniqueness",
        description: "Make attendance unique per date, employee and site, quarantining duplicates",
        apply: v007_attendance_scope_uniqueness::apply,
    },
];
