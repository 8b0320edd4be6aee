//! SQLite-based storage for journals, entries, user settings, and streaks.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use super::migrations;
use crate::entry::Entry;
use crate::error::{CoreError, DatabaseError};
use crate::journal::Journal;
use crate::streak::{EntryDirectory, StreakRecord, StreakStore};
use crate::user::UserSettings;

// === Helper Functions ===

fn conversion_err(err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

/// Parse a UUID from its TEXT column representation.
fn parse_uuid(s: &str) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(s).map_err(conversion_err)
}

/// Parse a calendar date from its `%Y-%m-%d` column representation.
fn parse_date(s: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(conversion_err)
}

/// Parse a datetime from its RFC3339 column representation.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_err)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Build an Entry from a database row.
///
/// Column order: id, journal_id, user_id, title, content, word_count,
/// entry_date, entry_datetime_utc, entry_timezone, location, weather,
/// is_pinned, created_at, updated_at.
fn row_to_entry(row: &rusqlite::Row) -> Result<Entry, rusqlite::Error> {
    Ok(Entry {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        journal_id: parse_uuid(&row.get::<_, String>(1)?)?,
        user_id: parse_uuid(&row.get::<_, String>(2)?)?,
        title: row.get(3)?,
        content: row.get(4)?,
        word_count: row.get(5)?,
        entry_date: parse_date(&row.get::<_, String>(6)?)?,
        entry_datetime_utc: parse_datetime(&row.get::<_, String>(7)?)?,
        entry_timezone: row.get(8)?,
        location: row.get(9)?,
        weather: row.get(10)?,
        is_pinned: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(13)?)?,
    })
}

/// Build a Journal from a database row.
fn row_to_journal(row: &rusqlite::Row) -> Result<Journal, rusqlite::Error> {
    Ok(Journal {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
        title: row.get(2)?,
        description: row.get(3)?,
        is_archived: row.get(4)?,
        entry_count: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}

const ENTRY_COLUMNS: &str = "id, journal_id, user_id, title, content, word_count, entry_date, \
     entry_datetime_utc, entry_timezone, location, weather, is_pinned, created_at, updated_at";

const JOURNAL_COLUMNS: &str =
    "id, user_id, title, description, is_archived, entry_count, created_at, updated_at";

/// SQLite database for journiv storage.
///
/// Stores journals, entries, user settings, and per-user streak records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/journiv/journiv.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()
            .map_err(|e| CoreError::Custom(e.to_string()))?
            .join("journiv.db");
        Self::open_at(&path)
    }

    /// Open a database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &std::path::Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|source| DatabaseError::OpenFailed {
                path: ":memory:".into(),
                source,
            })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), CoreError> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // === Journals ===

    pub fn create_journal(&self, journal: &Journal) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO journals (id, user_id, title, description, is_archived, entry_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                journal.id.to_string(),
                journal.user_id.to_string(),
                journal.title,
                journal.description,
                journal.is_archived,
                journal.entry_count,
                journal.created_at.to_rfc3339(),
                journal.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a journal by id, scoped to its owner.
    pub fn get_journal(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Journal>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {JOURNAL_COLUMNS} FROM journals WHERE id = ?1 AND user_id = ?2"),
                params![id.to_string(), user_id.to_string()],
                row_to_journal,
            )
            .optional()
    }

    pub fn list_journals(&self, user_id: Uuid) -> Result<Vec<Journal>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOURNAL_COLUMNS} FROM journals WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let journals = stmt
            .query_map(params![user_id.to_string()], row_to_journal)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(journals)
    }

    pub fn set_journal_archived(
        &self,
        id: Uuid,
        user_id: Uuid,
        archived: bool,
    ) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE journals SET is_archived = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
            params![
                id.to_string(),
                user_id.to_string(),
                archived,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Recount a journal's entries and store the result in `entry_count`.
    ///
    /// Returns the fresh count, or `None` if the journal does not exist.
    pub fn recalculate_journal_entry_count(
        &self,
        journal_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<u32>, rusqlite::Error> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE journal_id = ?1",
            params![journal_id.to_string()],
            |row| row.get(0),
        )?;
        let changed = self.conn.execute(
            "UPDATE journals SET entry_count = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
            params![
                journal_id.to_string(),
                user_id.to_string(),
                count,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok((changed > 0).then_some(count))
    }

    // === Entries ===

    pub fn insert_entry(&self, entry: &Entry) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            &format!("INSERT INTO entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
            params![
                entry.id.to_string(),
                entry.journal_id.to_string(),
                entry.user_id.to_string(),
                entry.title,
                entry.content,
                entry.word_count,
                format_date(entry.entry_date),
                entry.entry_datetime_utc.to_rfc3339(),
                entry.entry_timezone,
                entry.location,
                entry.weather,
                entry.is_pinned,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get an entry by id, scoped to its owner.
    pub fn get_entry(&self, id: Uuid, user_id: Uuid) -> Result<Option<Entry>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1 AND user_id = ?2"),
                params![id.to_string(), user_id.to_string()],
                row_to_entry,
            )
            .optional()
    }

    pub fn update_entry(&self, entry: &Entry) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE entries SET journal_id = ?2, title = ?3, content = ?4, word_count = ?5,
                entry_date = ?6, entry_datetime_utc = ?7, entry_timezone = ?8,
                location = ?9, weather = ?10, is_pinned = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                entry.id.to_string(),
                entry.journal_id.to_string(),
                entry.title,
                entry.content,
                entry.word_count,
                format_date(entry.entry_date),
                entry.entry_datetime_utc.to_rfc3339(),
                entry.entry_timezone,
                entry.location,
                entry.weather,
                entry.is_pinned,
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_entry(&self, id: Uuid) -> Result<bool, rusqlite::Error> {
        let deleted = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// List a journal's entries, pinned first, newest first.
    pub fn list_journal_entries(
        &self,
        journal_id: Uuid,
        limit: u32,
        offset: u32,
        include_pinned: bool,
    ) -> Result<Vec<Entry>, rusqlite::Error> {
        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE journal_id = ?1");
        if !include_pinned {
            sql.push_str(" AND is_pinned = 0");
        }
        sql.push_str(" ORDER BY is_pinned DESC, entry_datetime_utc DESC LIMIT ?2 OFFSET ?3");

        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![journal_id.to_string(), limit, offset], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// List a user's entries across all journals, newest first.
    pub fn list_user_entries(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Entry>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE user_id = ?1
             ORDER BY entry_datetime_utc DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let entries = stmt
            .query_map(params![user_id.to_string(), limit, offset], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Substring search over entry content, optionally scoped to a journal.
    pub fn search_entries(
        &self,
        user_id: Uuid,
        query: &str,
        journal_id: Option<Uuid>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Entry>, rusqlite::Error> {
        let pattern = format!("%{query}%");
        let mut sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE user_id = ?1 AND content LIKE ?2"
        );
        if journal_id.is_some() {
            sql.push_str(" AND journal_id = ?5");
        }
        sql.push_str(" ORDER BY entry_datetime_utc DESC LIMIT ?3 OFFSET ?4");

        let mut stmt = self.conn.prepare(&sql)?;
        let entries = match journal_id {
            Some(jid) => stmt
                .query_map(
                    params![user_id.to_string(), pattern, limit, offset, jid.to_string()],
                    row_to_entry,
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(
                    params![user_id.to_string(), pattern, limit, offset],
                    row_to_entry,
                )?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(entries)
    }

    /// Entries whose local date falls in `[start, end]`, newest first.
    pub fn entries_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        journal_id: Option<Uuid>,
    ) -> Result<Vec<Entry>, rusqlite::Error> {
        let mut sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE user_id = ?1 AND entry_date >= ?2 AND entry_date <= ?3"
        );
        if journal_id.is_some() {
            sql.push_str(" AND journal_id = ?4");
        }
        sql.push_str(" ORDER BY entry_datetime_utc DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let entries = match journal_id {
            Some(jid) => stmt
                .query_map(
                    params![
                        user_id.to_string(),
                        format_date(start),
                        format_date(end),
                        jid.to_string()
                    ],
                    row_to_entry,
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(
                    params![user_id.to_string(), format_date(start), format_date(end)],
                    row_to_entry,
                )?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(entries)
    }

    // === User settings ===

    pub fn upsert_user_settings(&self, settings: &UserSettings) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO user_settings (user_id, time_zone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                 time_zone = excluded.time_zone,
                 updated_at = excluded.updated_at",
            params![
                settings.user_id.to_string(),
                settings.time_zone,
                settings.created_at.to_rfc3339(),
                settings.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The user's preferred timezone, or `None` when no settings row
    /// exists. Callers supply their own fallback.
    pub fn user_timezone(&self, user_id: Uuid) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT time_zone FROM user_settings WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()
    }
}

impl EntryDirectory for Database {
    /// Distinct local calendar dates with at least one entry, across all
    /// of the user's journals. An unknown user yields an empty set.
    fn written_dates(&self, user_id: Uuid) -> Result<Vec<NaiveDate>, CoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT entry_date FROM entries WHERE user_id = ?1")?;
        let dates = stmt
            .query_map(params![user_id.to_string()], |row| {
                parse_date(&row.get::<_, String>(0)?)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dates)
    }
}

impl StreakStore for Database {
    fn load_streak(&self, user_id: Uuid) -> Result<Option<StreakRecord>, CoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT user_id, current_streak, longest_streak, last_entry_date, streak_start_date
                 FROM streaks WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok(StreakRecord {
                        user_id: parse_uuid(&row.get::<_, String>(0)?)?,
                        current_streak: row.get(1)?,
                        longest_streak: row.get(2)?,
                        last_entry_date: row
                            .get::<_, Option<String>>(3)?
                            .map(|s| parse_date(&s))
                            .transpose()?,
                        streak_start_date: row
                            .get::<_, Option<String>>(4)?
                            .map(|s| parse_date(&s))
                            .transpose()?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn upsert_streak(&self, record: &StreakRecord) -> Result<(), CoreError> {
        self.conn.execute(
            "INSERT INTO streaks (user_id, current_streak, longest_streak, last_entry_date, streak_start_date, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                 current_streak = excluded.current_streak,
                 longest_streak = excluded.longest_streak,
                 last_entry_date = excluded.last_entry_date,
                 streak_start_date = excluded.streak_start_date,
                 updated_at = excluded.updated_at",
            params![
                record.user_id.to_string(),
                record.current_streak,
                record.longest_streak,
                record.last_entry_date.map(format_date),
                record.streak_start_date.map(format_date),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
