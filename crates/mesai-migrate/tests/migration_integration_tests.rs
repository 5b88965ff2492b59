//! Integration tests for the built-in migration chain.
//!
//! Each test seeds an in-memory database at some intermediate version (or
//! with hand-made legacy tables), runs the remaining steps through the public
//! API and checks the resulting schema and rows with plain SQL.

use mesai_migrate::introspect::{column_exists, has_unique_constraint, index_exists, table_exists};
use mesai_migrate::migration::run_migrations;
use mesai_migrate::{MesaiDb, Registry};
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode};

// ── Helpers ────────────────────────────────────────────────────────────

fn latest() -> u32 {
    Registry::builtin().unwrap().latest()
}

/// Apply built-in steps `current+1..=target` without a ledger.
fn migrate(conn: &mut Connection, current: u32, target: u32) {
    let reached = Registry::builtin()
        .unwrap()
        .apply_through(conn, current, Some(target), |_, _| Ok(()))
        .unwrap();
    assert_eq!(reached, target);
}

fn at_version(version: u32) -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    migrate(&mut conn, 0, version);
    conn
}

/// Every catalog entry and every row of every table, in a stable order.
fn snapshot(conn: &Connection) -> Vec<String> {
    let mut out = Vec::new();
    let objects: Vec<(String, String, Option<String>)> = conn
        .prepare("SELECT type, name, sql FROM sqlite_master ORDER BY type, name")
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    for (kind, name, sql) in &objects {
        out.push(format!("{kind} {name}: {sql:?}"));
        if kind != "table" {
            continue;
        }
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM \"{name}\" ORDER BY rowid"))
            .unwrap();
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |r| {
                (0..width)
                    .map(|i| r.get::<_, Value>(i))
                    .collect::<Result<Vec<_>, _>>()
            })
            .unwrap();
        for row in rows {
            out.push(format!("  {name} {:?}", row.unwrap()));
        }
    }
    out
}

fn rule_rows(conn: &Connection, table: &str) -> Vec<(i64, f64, f64, f64)> {
    conn.prepare(&format!(
        "SELECT id, start_time, end_time, payout FROM {table} ORDER BY id"
    ))
    .unwrap()
    .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
    .unwrap()
    .collect::<Result<_, _>>()
    .unwrap()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

// ── Whole chain ────────────────────────────────────────────────────────

#[test]
fn empty_database_reaches_final_schema() {
    let conn = at_version(latest());

    for table in [
        "settings",
        "sites",
        "attendance",
        "adjustments",
        "overtime_rules",
        "holiday_overtime_rules",
        "attendance_dedupe_audit",
        "overtime_rule_multiplier_audit",
    ] {
        assert!(table_exists(&conn, table).unwrap(), "{table} missing");
    }
    assert!(column_exists(&conn, "attendance", "site_id").unwrap());
    assert!(column_exists(&conn, "adjustments", "note").unwrap());
    assert!(column_exists(&conn, "sites", "reference_start_time").unwrap());
    assert!(column_exists(&conn, "holiday_overtime_rules", "site_id").unwrap());
    assert!(!column_exists(&conn, "overtime_rules", "multiplier").unwrap());
    assert!(!has_unique_constraint(&conn, "attendance", &["work_date", "employee_name"]).unwrap());
    assert!(index_exists(&conn, "idx_attendance_day_scope").unwrap());

    let shadows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name LIKE '%\\_\\_shadow' ESCAPE '\\'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(shadows, 0);
}

#[test]
fn every_step_is_idempotent() {
    let registry = Registry::builtin().unwrap();
    for step in registry.steps() {
        let version = step.version.get();
        let conn = at_version(version);
        let before = snapshot(&conn);
        (step.apply)(&conn).unwrap();
        assert_eq!(before, snapshot(&conn), "re-running {} changed the database", step.version);
    }
}

#[test]
fn ledger_free_apply_pending_matches_ledger_run() {
    let mut bare = Connection::open_in_memory().unwrap();
    assert_eq!(mesai_migrate::apply_pending(&mut bare, 0).unwrap(), latest());
    assert!(!table_exists(&bare, "schema_version").unwrap());

    let mut ledgered = Connection::open_in_memory().unwrap();
    run_migrations(&mut ledgered, None).unwrap();
    ledgered.execute_batch("DROP TABLE schema_version").unwrap();

    assert_eq!(snapshot(&bare), snapshot(&ledgered));
}

#[test]
fn reopening_a_migrated_file_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mesai.db");
    drop(MesaiDb::open(&path).unwrap());

    let mut db = MesaiDb::open(&path).unwrap();
    let before = snapshot(db.conn());
    assert!(db.migrate(None).unwrap().is_noop());
    assert_eq!(before, snapshot(db.conn()));
}

// ── v003 sites ─────────────────────────────────────────────────────────

#[test]
fn hand_made_sites_table_is_repaired() {
    let mut conn = at_version(2);
    conn.execute_batch(
        "CREATE TABLE sites (id INTEGER PRIMARY KEY, name TEXT, shift_start TEXT);
         INSERT INTO sites (id, name, shift_start) VALUES (1, 'Depo', '08:00');",
    )
    .unwrap();

    migrate(&mut conn, 2, 3);

    assert!(!column_exists(&conn, "sites", "shift_start").unwrap());
    let (name, start): (String, String) = conn
        .query_row(
            "SELECT name, reference_start_time FROM sites WHERE id = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!((name.as_str(), start.as_str()), ("Depo", "08:00"));
}

// ── v004 absolute rule times ───────────────────────────────────────────

#[test]
fn offsets_become_absolute_and_multiplier_folds_into_payout() {
    let mut conn = at_version(3);
    conn.execute_batch(
        "INSERT INTO overtime_rules (start_time, end_time, payout, multiplier)
             VALUES (0.0, 1.0, 0, 2.0);
         INSERT INTO holiday_overtime_rules (start_time, end_time, payout)
             VALUES (0.5, 3.0, 150);",
    )
    .unwrap();

    migrate(&mut conn, 3, 4);

    assert_eq!(rule_rows(&conn, "overtime_rules"), vec![(1, 17.5, 18.5, 2.0)]);
    assert_eq!(
        rule_rows(&conn, "holiday_overtime_rules"),
        vec![(1, 18.0, 20.5, 150.0)]
    );
    let multiplier: f64 = conn
        .query_row("SELECT multiplier FROM overtime_rules", [], |r| r.get(0))
        .unwrap();
    assert_eq!(multiplier, 1.0);

    // A second pass sees absolute times and leaves everything alone.
    let before = snapshot(&conn);
    let step = Registry::builtin().unwrap().get(4).unwrap();
    (step.apply)(&conn).unwrap();
    assert_eq!(before, snapshot(&conn));
}

#[test]
fn configured_and_per_site_reference_times_are_used() {
    let mut conn = at_version(3);
    conn.execute_batch(
        "INSERT INTO settings (key, value) VALUES ('reference_start_time', '18:00');
         INSERT INTO sites (id, name, reference_start_time) VALUES (1, 'Merkez', '19:00');
         INSERT INTO sites (id, name, reference_start_time) VALUES (2, 'Depo', 'sabah');
         INSERT INTO overtime_rules (site_id, start_time, end_time, multiplier)
             VALUES (NULL, 0.5, 1.0, 1.0),
                    (1, 0.5, 1.0, 1.0),
                    (2, 0.5, 1.0, 1.0);",
    )
    .unwrap();

    migrate(&mut conn, 3, 4);

    let rows = rule_rows(&conn, "overtime_rules");
    assert_eq!(rows[0].1, 18.5, "global default");
    assert_eq!(rows[1].1, 19.5, "site override");
    assert_eq!(rows[2].1, 18.5, "invalid override falls back");
}

#[test]
fn converted_site_groups_are_skipped_independently() {
    let mut conn = at_version(3);
    conn.execute_batch(
        "INSERT INTO holiday_overtime_rules (site_id, start_time, end_time, payout)
             VALUES (1, 18.0, 20.0, 100),
                    (1, 0.0, 2.0, 100),
                    (2, 0.0, 2.0, 100);",
    )
    .unwrap();

    migrate(&mut conn, 3, 4);

    let rows = rule_rows(&conn, "holiday_overtime_rules");
    // Site 1 already holds an absolute time, so its whole group is kept.
    assert_eq!((rows[0].1, rows[0].2), (18.0, 20.0));
    assert_eq!((rows[1].1, rows[1].2), (0.0, 2.0));
    assert_eq!((rows[2].1, rows[2].2), (17.5, 19.5));
}

#[test]
fn malformed_rule_row_is_left_as_is() {
    let mut conn = at_version(3);
    conn.execute_batch(
        "INSERT INTO overtime_rules (start_time, end_time, multiplier)
             VALUES ('yarim', 1.0, 1.0),
                    (1.0, 2.0, 1.5);",
    )
    .unwrap();

    migrate(&mut conn, 3, 4);

    let start: Value = conn
        .query_row("SELECT start_time FROM overtime_rules WHERE id = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(start, Value::Text("yarim".into()));
    let (start, end, payout): (f64, f64, f64) = conn
        .query_row(
            "SELECT start_time, end_time, payout FROM overtime_rules WHERE id = 2",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!((start, end, payout), (18.5, 19.5, 3.0));
}

// ── v005 adjustment checks ─────────────────────────────────────────────

#[test]
fn adjustments_are_coerced_then_enforced() {
    let mut conn = at_version(4);
    conn.execute_batch(
        "INSERT INTO adjustments (employee_name, work_date, category, amount, note)
             VALUES ('Ayse', '2024-03-01', 'Yanlis', -125.0, 'eski kayit'),
                    ('Mehmet', '2024-03-01', 'EK', 75.0, NULL);",
    )
    .unwrap();

    migrate(&mut conn, 4, 5);

    let rows: Vec<(String, f64, Option<String>)> = conn
        .prepare("SELECT category, amount, note FROM adjustments ORDER BY id")
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            ("Kesinti".to_string(), 125.0, Some("eski kayit".to_string())),
            ("Ek".to_string(), 75.0, None),
        ]
    );

    let bad_category = conn
        .execute(
            "INSERT INTO adjustments (employee_name, work_date, category, amount)
             VALUES ('Can', '2024-03-02', 'Prim', 10)",
            [],
        )
        .unwrap_err();
    assert!(is_constraint_violation(&bad_category), "{bad_category}");

    let negative = conn
        .execute(
            "INSERT INTO adjustments (employee_name, work_date, category, amount)
             VALUES ('Can', '2024-03-02', 'Ek', -1)",
            [],
        )
        .unwrap_err();
    assert!(is_constraint_violation(&negative), "{negative}");
}

#[test]
fn rebuilt_adjustments_do_not_reuse_deleted_ids() {
    let mut conn = at_version(4);
    conn.execute_batch(
        "INSERT INTO adjustments (employee_name, work_date, category, amount) VALUES
             ('Ayse', '2024-03-01', 'Ek', 10),
             ('Ayse', '2024-03-02', 'Ek', 20),
             ('Ayse', '2024-03-03', 'Ek', 30);
         DELETE FROM adjustments WHERE id = 3;",
    )
    .unwrap();

    migrate(&mut conn, 4, 5);

    conn.execute(
        "INSERT INTO adjustments (employee_name, work_date, category, amount)
         VALUES ('Can', '2024-03-04', 'Kesinti', 5)",
        [],
    )
    .unwrap();
    assert_eq!(conn.last_insert_rowid(), 4);
}

// ── v006 drop multiplier ───────────────────────────────────────────────

#[test]
fn multipliers_skipped_by_conversion_survive_the_column_drop() {
    let mut conn = at_version(3);
    conn.execute_batch(
        "INSERT INTO overtime_rules (site_id, start_time, end_time, payout, multiplier)
             VALUES (NULL, 'yarim', 1.0, 0, 1.5),
                    (1, 18.0, 20.0, 0, 2.0),
                    (2, 0.0, 1.0, 0, 2.0);",
    )
    .unwrap();

    migrate(&mut conn, 3, 6);

    assert!(!column_exists(&conn, "overtime_rules", "multiplier").unwrap());
    let preserved: Vec<(i64, f64)> = conn
        .prepare("SELECT rule_id, multiplier FROM overtime_rule_multiplier_audit ORDER BY rule_id")
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    // Row 3 was converted, so its multiplier already lives in payout.
    assert_eq!(preserved, vec![(1, 1.5), (2, 2.0)]);
    let payout: f64 = conn
        .query_row("SELECT payout FROM overtime_rules WHERE id = 3", [], |r| r.get(0))
        .unwrap();
    assert_eq!(payout, 2.0);
}

#[test]
fn interrupted_multiplier_rebuild_is_resumed() {
    let mut conn = at_version(5);
    conn.execute_batch(
        "INSERT INTO overtime_rules (start_time, end_time, payout) VALUES (17.5, 18.5, 2.0);
         -- State left behind by a rebuild that stopped between DROP and RENAME.
         CREATE TABLE overtime_rules__shadow (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             site_id INTEGER,
             start_time REAL NOT NULL,
             end_time REAL NOT NULL,
             payout REAL NOT NULL DEFAULT 0
         );
         INSERT INTO overtime_rules__shadow (id, site_id, start_time, end_time, payout)
             SELECT id, site_id, start_time, end_time, payout FROM overtime_rules;
         DROP TABLE overtime_rules;",
    )
    .unwrap();

    migrate(&mut conn, 5, 6);

    assert!(!table_exists(&conn, "overtime_rules__shadow").unwrap());
    assert!(!column_exists(&conn, "overtime_rules", "multiplier").unwrap());
    assert_eq!(rule_rows(&conn, "overtime_rules"), vec![(1, 17.5, 18.5, 2.0)]);
}

// ── v007 attendance scope ──────────────────────────────────────────────

#[test]
fn same_day_at_two_sites_is_allowed() {
    let conn = at_version(latest());
    conn.execute_batch(
        "INSERT INTO attendance (work_date, employee_name, site_id) VALUES ('2024-05-02', 'Ayse', 1);
         INSERT INTO attendance (work_date, employee_name, site_id) VALUES ('2024-05-02', 'Ayse', 2);",
    )
    .unwrap();

    let err = conn
        .execute(
            "INSERT INTO attendance (work_date, employee_name, site_id) VALUES ('2024-05-02', 'Ayse', 2)",
            [],
        )
        .unwrap_err();
    assert!(is_constraint_violation(&err), "{err}");
}

#[test]
fn legacy_duplicates_are_quarantined() {
    let mut conn = Connection::open_in_memory().unwrap();
    // Created by hand before the schema was versioned, without the
    // date/employee constraint.
    conn.execute_batch(
        "CREATE TABLE attendance (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             work_date TEXT NOT NULL,
             employee_name TEXT NOT NULL,
             check_in TEXT,
             check_out TEXT
         );
         INSERT INTO attendance (work_date, employee_name, check_in) VALUES
             ('2024-05-02', 'Ayse', '08:00'),
             ('2024-05-02', 'Ayse', '08:05'),
             ('2024-05-03', 'Ayse', '08:10');",
    )
    .unwrap();
    migrate(&mut conn, 0, 2);
    conn.execute_batch(
        "INSERT INTO attendance (work_date, employee_name, site_id, check_in) VALUES
             ('2024-05-03', 'Ayse', 4, '12:00'),
             ('2024-05-03', 'Ayse', 4, '12:30');",
    )
    .unwrap();

    migrate(&mut conn, 2, latest());

    let kept: Vec<(i64, Option<i64>)> = conn
        .prepare("SELECT id, site_id FROM attendance ORDER BY id")
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(kept, vec![(2, None), (3, None), (5, Some(4))]);

    let audited: Vec<(i64, String)> = conn
        .prepare("SELECT original_id, reason FROM attendance_dedupe_audit ORDER BY original_id")
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        audited,
        vec![
            (1, "v007_attendance_scope_uniqueness".to_string()),
            (4, "v007_attendance_scope_uniqueness".to_string()),
        ]
    );
}
