//! Database schema migrations for journiv.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current version.

use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations to bring the database to the current
/// schema version.
///
/// # Errors
/// Returns an error if a migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version, 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// v1: base tables for journals, entries, user settings, and streaks.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS journals (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            title       TEXT NOT NULL,
            description TEXT,
            is_archived INTEGER NOT NULL DEFAULT 0,
            entry_count INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entries (
            id                 TEXT PRIMARY KEY,
            journal_id         TEXT NOT NULL REFERENCES journals(id),
            user_id            TEXT NOT NULL,
            title              TEXT NOT NULL,
            content            TEXT NOT NULL DEFAULT '',
            word_count         INTEGER NOT NULL DEFAULT 0,
            entry_date         TEXT NOT NULL,
            entry_datetime_utc TEXT NOT NULL,
            entry_timezone     TEXT NOT NULL DEFAULT 'UTC',
            location           TEXT,
            weather            TEXT,
            is_pinned          INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_settings (
            user_id    TEXT PRIMARY KEY,
            time_zone  TEXT NOT NULL DEFAULT 'UTC',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS streaks (
            user_id           TEXT PRIMARY KEY,
            current_streak    INTEGER NOT NULL DEFAULT 0,
            longest_streak    INTEGER NOT NULL DEFAULT 0,
            last_entry_date   TEXT,
            streak_start_date TEXT,
            updated_at        TEXT NOT NULL
        );",
    )?;
    set_schema_version(conn, 1)
}

/// v2: indexes for the common query patterns (per-user date sets, journal
/// listings, pinned-first ordering).
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_entries_user_date ON entries(user_id, entry_date);
        CREATE INDEX IF NOT EXISTS idx_entries_journal ON entries(journal_id);
        CREATE INDEX IF NOT EXISTS idx_entries_user_datetime ON entries(user_id, entry_datetime_utc);",
    )?;
    set_schema_version(conn, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);
    }

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn), 0);
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);
    }
}
