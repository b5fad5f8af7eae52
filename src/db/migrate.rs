//! Schema migrations.
//!
//! Each migration runs once; applied versions are recorded in the `log`
//! table with `operation = 'migration_applied'`.

use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, OptionalExtension, Result};
use tracing::info;

struct Migration {
    version: &'static str,
    message: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20240301_0001_create_attendance_records",
        message: "Created attendance_records table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS attendance_records (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            person      TEXT NOT NULL,
            project     TEXT NOT NULL,
            date        TEXT NOT NULL,
            start_time  TEXT NOT NULL,
            end_time    TEXT NOT NULL,
            attachments TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            CHECK (start_time <= end_time)
        );

        CREATE INDEX IF NOT EXISTS idx_attendance_key
            ON attendance_records(person, project, date);
        "#,
    },
    Migration {
        version: "20240301_0002_create_projects",
        message: "Created projects table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS projects (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            company         TEXT NOT NULL DEFAULT '',
            owner           TEXT NOT NULL DEFAULT '',
            deadline        TEXT,
            estimated_hours INTEGER,
            layout          TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_projects_name
            ON projects(name COLLATE NOCASE);
        "#,
    },
    Migration {
        version: "20240301_0003_create_activity_logs",
        message: "Created activity_logs table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS activity_logs (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            description   TEXT NOT NULL,
            activity_date TEXT NOT NULL,
            people_count  INTEGER,
            start_time    TEXT,
            end_time      TEXT,
            owner         TEXT NOT NULL,
            project_id    INTEGER REFERENCES projects(id),
            attachments   TEXT NOT NULL DEFAULT '',
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activity_owner_date
            ON activity_logs(owner COLLATE NOCASE, activity_date, project_id);
        "#,
    },
    Migration {
        version: "20240415_0004_add_project_status",
        message: "Added status and observation to projects",
        sql: r#"
        ALTER TABLE projects ADD COLUMN status TEXT;
        ALTER TABLE projects ADD COLUMN observation TEXT;
        "#,
    },
];

/// Ensure that the `log` table exists with the modern schema.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> AppResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(m.sql)
        .map_err(|e| AppError::Migration(format!("{}: {}", m.version, e)))?;

    tx.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [m.version, m.message],
    )?;

    tx.commit()?;
    info!(version = m.version, "{}", m.message);
    Ok(())
}

/// Public entry point: run all pending migrations, oldest first.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    ensure_log_table(conn)?;

    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            apply(conn, m)?;
        }
    }

    Ok(())
}

/// Versions already applied to `conn`, in application order.
pub fn applied_versions(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT target FROM log WHERE operation = 'migration_applied' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
