//! Entry lifecycle operations.
//!
//! Wraps the database with the create/update/delete rules of the
//! backend: timestamp normalization, word counting, journal ownership
//! checks, and the derived-view refreshes (journal entry count, writing
//! streak) that follow every date-affecting mutation.
//!
//! Streak recomputation is best-effort relative to the entry mutation
//! that triggered it: by the time it runs the mutation has committed, so
//! a recompute failure is traced and swallowed, never propagated. The
//! next successful recompute self-heals the record.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, ValidationError};
use crate::storage::{Config, Database, PaginationConfig};
use crate::streak::StreakEngine;

use super::{
    normalize_timestamp, normalize_timezone_name, shift_to_local_date, word_count, Entry,
    EntryPatch, NewEntry,
};

/// Entry lifecycle service over a [`Database`].
pub struct EntryService<'a> {
    db: &'a Database,
    pagination: PaginationConfig,
    /// Timezone applied when neither the entry nor the user supplies one.
    default_timezone: String,
}

impl<'a> EntryService<'a> {
    /// Create a service with default configuration.
    pub fn new(db: &'a Database) -> Self {
        Self::with_config(db, &Config::default())
    }

    pub fn with_config(db: &'a Database, config: &Config) -> Self {
        Self {
            db,
            pagination: config.pagination,
            default_timezone: config.default_timezone.clone(),
        }
    }

    /// Clamp a requested page limit to the configured range.
    ///
    /// Zero falls back to the default limit.
    fn normalize_limit(&self, limit: u32) -> u32 {
        if limit == 0 {
            self.pagination.default_limit
        } else {
            limit.min(self.pagination.max_limit)
        }
    }

    fn owned_entry(&self, entry_id: Uuid, user_id: Uuid) -> Result<Entry, CoreError> {
        match self.db.get_entry(entry_id, user_id)? {
            Some(entry) => Ok(entry),
            None => {
                warn!(%user_id, %entry_id, "entry not found");
                Err(CoreError::EntryNotFound)
            }
        }
    }

    /// Refresh the derived views after an entry mutation.
    ///
    /// The entry mutation has already committed; failures here must not
    /// roll it back, so they are traced and dropped.
    fn refresh_derived(&self, user_id: Uuid, journal_id: Uuid) {
        match self.db.recalculate_journal_entry_count(journal_id, user_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(%user_id, %journal_id, "journal missing during entry recount")
            }
            Err(err) => warn!(%user_id, %journal_id, error = %err, "journal recount failed"),
        }
        if let Err(err) = StreakEngine::new(self.db).recompute(user_id) {
            warn!(%user_id, error = %err, "streak recompute failed after entry mutation");
        }
    }

    /// Create a new entry in a journal the user owns.
    ///
    /// # Errors
    /// Returns [`CoreError::JournalNotFound`] if the journal does not
    /// exist or belongs to another user, or a validation error for an
    /// unknown timezone.
    pub fn create_entry(&self, user_id: Uuid, data: NewEntry) -> Result<Entry, CoreError> {
        let journal = match self.db.get_journal(data.journal_id, user_id)? {
            Some(journal) => journal,
            None => {
                warn!(%user_id, journal_id = %data.journal_id, "journal not found");
                return Err(CoreError::JournalNotFound);
            }
        };

        // Fallback chain: entry timezone, then the user's preference,
        // then the configured default.
        let fallback_tz = self
            .db
            .user_timezone(user_id)?
            .unwrap_or_else(|| self.default_timezone.clone());
        let ts = normalize_timestamp(
            data.entry_date,
            data.entry_datetime_utc,
            data.entry_timezone.as_deref(),
            &fallback_tz,
        )?;

        let now = Utc::now();
        let entry = Entry {
            id: Uuid::new_v4(),
            journal_id: journal.id,
            user_id,
            word_count: word_count(&data.content),
            title: data.title,
            content: data.content,
            entry_date: ts.date,
            entry_datetime_utc: ts.datetime_utc,
            entry_timezone: ts.timezone,
            location: data.location,
            weather: data.weather,
            is_pinned: false,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_entry(&entry)?;
        info!(%user_id, entry_id = %entry.id, journal_id = %entry.journal_id, "entry created");

        self.refresh_derived(user_id, entry.journal_id);
        Ok(entry)
    }

    /// Update an entry.
    ///
    /// Journal moves are validated (target must exist and must not be
    /// archived). Changes to the instant, local date, or timezone
    /// re-derive `entry_date` and trigger a streak recompute; title,
    /// content, location, weather, and pin changes do not.
    pub fn update_entry(
        &self,
        entry_id: Uuid,
        user_id: Uuid,
        patch: EntryPatch,
    ) -> Result<Entry, CoreError> {
        let mut entry = self.owned_entry(entry_id, user_id)?;

        let old_journal_id = entry.journal_id;
        let mut moved = false;
        if let Some(target) = patch.journal_id {
            if target != entry.journal_id {
                let journal = match self.db.get_journal(target, user_id)? {
                    Some(journal) => journal,
                    None => {
                        warn!(%user_id, journal_id = %target, "target journal not found");
                        return Err(CoreError::JournalNotFound);
                    }
                };
                if journal.is_archived {
                    warn!(%user_id, %entry_id, journal_id = %target, "cannot move entry to archived journal");
                    return Err(ValidationError::ArchivedJournal.into());
                }
                entry.journal_id = target;
                moved = true;
            }
        }

        if let Some(title) = patch.title {
            entry.title = title;
        }
        if let Some(content) = patch.content {
            entry.word_count = word_count(&content);
            entry.content = content;
        }

        let mut timezone_changed = false;
        if let Some(tz) = patch.entry_timezone.as_deref() {
            entry.entry_timezone = normalize_timezone_name(Some(tz), "UTC");
            timezone_changed = true;
        }

        let mut timestamp_changed = false;
        if let Some(instant) = patch.entry_datetime_utc {
            entry.entry_datetime_utc = instant;
            timestamp_changed = true;
        }
        if let Some(date) = patch.entry_date {
            entry.entry_datetime_utc =
                shift_to_local_date(entry.entry_datetime_utc, &entry.entry_timezone, date)?;
            timestamp_changed = true;
        }

        let date_affecting = timestamp_changed || timezone_changed;
        if date_affecting {
            entry.entry_date = super::local_date_for(entry.entry_datetime_utc, &entry.entry_timezone)?;
        }

        if let Some(location) = patch.location {
            entry.location = Some(location);
        }
        if let Some(weather) = patch.weather {
            entry.weather = Some(weather);
        }
        if let Some(pinned) = patch.is_pinned {
            entry.is_pinned = pinned;
        }

        entry.updated_at = Utc::now();
        self.db.update_entry(&entry)?;
        info!(%user_id, %entry_id, "entry updated");

        if moved {
            // Both journals' counts changed; streak set did not.
            self.refresh_journal_count(user_id, old_journal_id);
            self.refresh_journal_count(user_id, entry.journal_id);
        }
        if date_affecting {
            self.refresh_derived(user_id, entry.journal_id);
        }
        Ok(entry)
    }

    fn refresh_journal_count(&self, user_id: Uuid, journal_id: Uuid) {
        match self.db.recalculate_journal_entry_count(journal_id, user_id) {
            Ok(Some(_)) => {}
            Ok(None) => warn!(%user_id, %journal_id, "journal missing during entry recount"),
            Err(err) => warn!(%user_id, %journal_id, error = %err, "journal recount failed"),
        }
    }

    /// Hard delete an entry.
    pub fn delete_entry(&self, entry_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let entry = self.owned_entry(entry_id, user_id)?;
        self.db.delete_entry(entry.id)?;
        info!(%user_id, %entry_id, "entry deleted");

        self.refresh_derived(user_id, entry.journal_id);
        Ok(())
    }

    /// Toggle pin status. Pin changes never touch the streak.
    pub fn toggle_pin(&self, entry_id: Uuid, user_id: Uuid) -> Result<Entry, CoreError> {
        let mut entry = self.owned_entry(entry_id, user_id)?;
        entry.is_pinned = !entry.is_pinned;
        entry.updated_at = Utc::now();
        self.db.update_entry(&entry)?;
        info!(%user_id, %entry_id, pinned = entry.is_pinned, "entry pin toggled");
        Ok(entry)
    }

    /// Entries in one journal, pinned first, newest first.
    pub fn journal_entries(
        &self,
        journal_id: Uuid,
        user_id: Uuid,
        limit: u32,
        offset: u32,
        include_pinned: bool,
    ) -> Result<Vec<Entry>, CoreError> {
        if self.db.get_journal(journal_id, user_id)?.is_none() {
            return Err(CoreError::JournalNotFound);
        }
        let limit = self.normalize_limit(limit);
        Ok(self
            .db
            .list_journal_entries(journal_id, limit, offset, include_pinned)?)
    }

    /// All of a user's entries across journals, newest first.
    pub fn user_entries(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Entry>, CoreError> {
        let limit = self.normalize_limit(limit);
        Ok(self.db.list_user_entries(user_id, limit, offset)?)
    }

    /// Substring search over entry content.
    pub fn search_entries(
        &self,
        user_id: Uuid,
        query: &str,
        journal_id: Option<Uuid>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Entry>, CoreError> {
        let limit = self.normalize_limit(limit);
        Ok(self
            .db
            .search_entries(user_id, query, journal_id, limit, offset)?)
    }

    /// Entries whose local date falls within an inclusive range.
    pub fn entries_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        journal_id: Option<Uuid>,
    ) -> Result<Vec<Entry>, CoreError> {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }
        Ok(self.db.entries_between(user_id, start, end, journal_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::streak::StreakEngine;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup() -> (Database, Uuid, Journal) {
        let db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let journal = Journal::new(user, "Daily");
        db.create_journal(&journal).unwrap();
        (db, user, journal)
    }

    fn new_entry(journal_id: Uuid, date: &str) -> NewEntry {
        NewEntry {
            journal_id,
            title: "Entry".to_string(),
            content: "a few words".to_string(),
            entry_date: Some(d(date)),
            entry_timezone: Some("UTC".to_string()),
            ..NewEntry::default()
        }
    }

    #[test]
    fn create_rejects_foreign_journal() {
        let (db, _user, journal) = setup();
        let service = EntryService::new(&db);
        let stranger = Uuid::new_v4();
        let err = service
            .create_entry(stranger, new_entry(journal.id, "2024-05-01"))
            .unwrap_err();
        assert!(matches!(err, CoreError::JournalNotFound));
    }

    #[test]
    fn create_updates_count_and_streak() {
        let (db, user, journal) = setup();
        let service = EntryService::new(&db);

        service
            .create_entry(user, new_entry(journal.id, "2024-05-01"))
            .unwrap();
        service
            .create_entry(user, new_entry(journal.id, "2024-05-02"))
            .unwrap();

        let loaded = db.get_journal(journal.id, user).unwrap().unwrap();
        assert_eq!(loaded.entry_count, 2);

        let record = StreakEngine::new(&db).get(user).unwrap();
        assert_eq!(record.current_streak, 2);
        assert_eq!(record.last_entry_date, Some(d("2024-05-02")));
    }

    #[test]
    fn create_uses_user_timezone_fallback() {
        let (db, user, journal) = setup();
        db.upsert_user_settings(&crate::user::UserSettings::new(user, "Asia/Tokyo"))
            .unwrap();

        let service = EntryService::new(&db);
        let entry = service
            .create_entry(
                user,
                NewEntry {
                    journal_id: journal.id,
                    title: "Entry".to_string(),
                    content: String::new(),
                    ..NewEntry::default()
                },
            )
            .unwrap();
        assert_eq!(entry.entry_timezone, "Asia/Tokyo");
    }

    #[test]
    fn create_uses_configured_default_timezone() {
        // No entry timezone and no settings row: the configured default
        // is the last link in the fallback chain.
        let (db, user, journal) = setup();
        let config = Config {
            default_timezone: "Pacific/Honolulu".to_string(),
            ..Config::default()
        };

        let service = EntryService::with_config(&db, &config);
        let entry = service
            .create_entry(
                user,
                NewEntry {
                    journal_id: journal.id,
                    title: "Entry".to_string(),
                    content: String::new(),
                    ..NewEntry::default()
                },
            )
            .unwrap();
        assert_eq!(entry.entry_timezone, "Pacific/Honolulu");

        // A settings row takes precedence over the configured default.
        db.upsert_user_settings(&crate::user::UserSettings::new(user, "Asia/Tokyo"))
            .unwrap();
        let entry = service
            .create_entry(
                user,
                NewEntry {
                    journal_id: journal.id,
                    title: "Entry".to_string(),
                    content: String::new(),
                    ..NewEntry::default()
                },
            )
            .unwrap();
        assert_eq!(entry.entry_timezone, "Asia/Tokyo");
    }

    #[test]
    fn content_update_keeps_streak_stale() {
        let (db, user, journal) = setup();
        let service = EntryService::new(&db);
        let entry = service
            .create_entry(user, new_entry(journal.id, "2024-05-01"))
            .unwrap();

        let before = StreakEngine::new(&db).get(user).unwrap();
        let updated = service
            .update_entry(
                entry.id,
                user,
                EntryPatch {
                    content: Some("rewritten with more words".to_string()),
                    ..EntryPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.word_count, 4);
        assert_eq!(updated.entry_date, entry.entry_date);
        assert_eq!(StreakEngine::new(&db).get(user).unwrap(), before);
    }

    #[test]
    fn date_update_moves_streak() {
        let (db, user, journal) = setup();
        let service = EntryService::new(&db);
        let entry = service
            .create_entry(user, new_entry(journal.id, "2024-05-01"))
            .unwrap();

        let updated = service
            .update_entry(
                entry.id,
                user,
                EntryPatch {
                    entry_date: Some(d("2024-05-07")),
                    ..EntryPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.entry_date, d("2024-05-07"));

        let record = StreakEngine::new(&db).get(user).unwrap();
        assert_eq!(record.last_entry_date, Some(d("2024-05-07")));
        assert_eq!(record.current_streak, 1);
    }

    #[test]
    fn timezone_update_rederives_date() {
        let (db, user, journal) = setup();
        let service = EntryService::new(&db);
        let entry = service
            .create_entry(
                user,
                NewEntry {
                    journal_id: journal.id,
                    title: "Late night".to_string(),
                    content: String::new(),
                    entry_datetime_utc: Some(
                        chrono::DateTime::parse_from_rfc3339("2024-05-01T23:30:00Z")
                            .unwrap()
                            .with_timezone(&Utc),
                    ),
                    entry_timezone: Some("UTC".to_string()),
                    ..NewEntry::default()
                },
            )
            .unwrap();
        assert_eq!(entry.entry_date, d("2024-05-01"));

        // The same instant is already May 2nd in Tokyo.
        let updated = service
            .update_entry(
                entry.id,
                user,
                EntryPatch {
                    entry_timezone: Some("Asia/Tokyo".to_string()),
                    ..EntryPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.entry_date, d("2024-05-02"));
    }

    #[test]
    fn move_to_archived_journal_is_rejected() {
        let (db, user, journal) = setup();
        let archived = Journal::new(user, "Old");
        db.create_journal(&archived).unwrap();
        db.set_journal_archived(archived.id, user, true).unwrap();

        let service = EntryService::new(&db);
        let entry = service
            .create_entry(user, new_entry(journal.id, "2024-05-01"))
            .unwrap();

        let err = service
            .update_entry(
                entry.id,
                user,
                EntryPatch {
                    journal_id: Some(archived.id),
                    ..EntryPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ArchivedJournal)
        ));
    }

    #[test]
    fn journal_move_recounts_both_journals() {
        let (db, user, journal) = setup();
        let other = Journal::new(user, "Travel");
        db.create_journal(&other).unwrap();

        let service = EntryService::new(&db);
        let entry = service
            .create_entry(user, new_entry(journal.id, "2024-05-01"))
            .unwrap();

        service
            .update_entry(
                entry.id,
                user,
                EntryPatch {
                    journal_id: Some(other.id),
                    ..EntryPatch::default()
                },
            )
            .unwrap();

        assert_eq!(db.get_journal(journal.id, user).unwrap().unwrap().entry_count, 0);
        assert_eq!(db.get_journal(other.id, user).unwrap().unwrap().entry_count, 1);
    }

    #[test]
    fn pagination_limit_is_normalized() {
        let (db, _user, _journal) = setup();
        let service = EntryService::new(&db);
        assert_eq!(service.normalize_limit(0), 50);
        assert_eq!(service.normalize_limit(10), 10);
        assert_eq!(service.normalize_limit(1000), 100);
    }

    #[test]
    fn entries_between_validates_range() {
        let (db, user, _journal) = setup();
        let service = EntryService::new(&db);
        let err = service
            .entries_between(user, d("2024-05-02"), d("2024-05-01"), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
