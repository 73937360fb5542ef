use chrono::Utc;
use rusqlite::{Connection, Row};
use tracing::info;

use crate::error::AppResult;

const USER_VERSION: i32 = 3;
const LEGACY_OWNER_ID: &str = "local";

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;

    let mut current_version = current_version(conn)?;

    if current_version < 1 {
        info!(target: "app::db", version = current_version, "running migration v1");
        migrate_to_v1(conn)?;
        current_version = 1;
        set_user_version(conn, current_version)?;
        record_migration(conn, 1, "Add task ownership and lookup indexes")?;
    }

    if current_version < 2 {
        info!(target: "app::db", version = current_version, "running migration v2");
        migrate_to_v2(conn)?;
        current_version = 2;
        set_user_version(conn, current_version)?;
        record_migration(conn, 2, "Add app settings with scoring defaults")?;
    }

    if current_version < 3 {
        info!(target: "app::db", version = current_version, "running migration v3");
        migrate_to_v3(conn)?;
        current_version = 3;
        set_user_version(conn, current_version)?;
        record_migration(conn, 3, "Add performance report snapshots")?;
    }

    if current_version != USER_VERSION {
        set_user_version(conn, USER_VERSION)?;
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> AppResult<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn set_user_version(conn: &Connection, version: i32) -> AppResult<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, description: &str) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO migration_history (version, description, applied_at) VALUES (?1, ?2, ?3)",
        (version, description, now),
    )?;
    Ok(())
}

fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    // Databases created before ownership existed get their rows assigned to a local owner.
    ensure_column(
        conn,
        "tasks",
        "owner_id",
        &format!("TEXT NOT NULL DEFAULT '{LEGACY_OWNER_ID}'"),
    )?;
    ensure_column(conn, "tasks", "estimated_time", "REAL")?;

    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tasks_owner_created_at
            ON tasks(owner_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_tasks_deadline
            ON tasks(deadline);
        "#,
    )?;

    Ok(())
}

fn migrate_to_v2(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_app_settings_updated_at
            ON app_settings(updated_at);
        "#,
    )?;

    let now = Utc::now().to_rfc3339();
    for (key, value) in [("timezone", "UTC"), ("status_granularity_minutes", "1")] {
        conn.execute(
            "INSERT OR IGNORE INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            (key, value, &now),
        )?;
    }

    Ok(())
}

fn migrate_to_v3(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS performance_snapshots (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            as_of TEXT NOT NULL,
            overall_score REAL NOT NULL,
            achievement TEXT NOT NULL,
            report_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_performance_snapshots_owner_year
            ON performance_snapshots(owner_id, year);
        CREATE INDEX IF NOT EXISTS idx_performance_snapshots_created_at
            ON performance_snapshots(created_at);
        "#,
    )?;

    Ok(())
}

fn ensure_column(conn: &Connection, table: &str, column: &str, definition: &str) -> AppResult<()> {
    if !column_exists(conn, table, column)? {
        let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition};");
        conn.execute(&sql, [])?;
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> AppResult<bool> {
    let pragma = format!("PRAGMA table_info({table})");
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        if equals_name(row, column)? {
            return Ok(true);
        }
    }

    Ok(false)
}

fn equals_name(row: &Row<'_>, column: &str) -> Result<bool, rusqlite::Error> {
    let name: String = row.get(1)?;
    Ok(name.eq_ignore_ascii_case(column))
}
