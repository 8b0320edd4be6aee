//! Writing-streak analytics.
//!
//! A streak is a maximal run of consecutive calendar days on which a user
//! has at least one entry. The engine recomputes the per-user record from
//! scratch on every date-affecting entry mutation: the full set of distinct
//! written dates is sorted and partitioned into runs in a single scan.
//! Full recomputation trades a cheap O(n log n) pass for correctness under
//! arbitrary insert/delete/update sequences, where incremental patching
//! would have to handle run merges and splits case by case.
//!
//! The record is a derived view, not a transactional invariant of entry
//! mutation: a failed recompute is recovered by the next one, since the
//! computation depends only on the current stored entry dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Per-user writing-streak snapshot.
///
/// One record per user, persisted as a keyed row and overwritten in full
/// on every recompute. `longest_streak` is combined with the previously
/// stored value via `max()` so the historical maximum survives deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub user_id: Uuid,
    /// Consecutive days ending at the most recent written day.
    pub current_streak: u32,
    /// Historical maximum; never decreases through normal recomputation.
    pub longest_streak: u32,
    /// Most recent written date, local to the entry's own timezone.
    pub last_entry_date: Option<NaiveDate>,
    /// First date of the run that ends at `last_entry_date`.
    pub streak_start_date: Option<NaiveDate>,
}

impl StreakRecord {
    /// The zero-state record for a user with no entries.
    pub fn zero(user_id: Uuid) -> Self {
        Self {
            user_id,
            current_streak: 0,
            longest_streak: 0,
            last_entry_date: None,
            streak_start_date: None,
        }
    }
}

/// Source of the distinct local calendar dates a user has written on.
///
/// Implementations must return each date at most once, across all of the
/// user's journals, using the timezone stored on each entry. An unknown
/// user yields an empty list, not an error. Order is not required.
pub trait EntryDirectory {
    fn written_dates(&self, user_id: Uuid) -> Result<Vec<NaiveDate>, CoreError>;
}

/// Keyed persistence for streak records, one row per user.
///
/// `upsert` replaces the row outright; the max-combine of `longest_streak`
/// happens in the engine, which has already loaded the prior record.
pub trait StreakStore {
    fn load_streak(&self, user_id: Uuid) -> Result<Option<StreakRecord>, CoreError>;
    fn upsert_streak(&self, record: &StreakRecord) -> Result<(), CoreError>;
}

/// A maximal run of consecutive calendar days, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateRun {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRun {
    fn len_days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }
}

/// Partition sorted, deduplicated dates into maximal consecutive runs.
///
/// A run continues while the next date is exactly one day after the
/// previous one; any larger gap starts a new run.
fn partition_runs(dates: &[NaiveDate]) -> Vec<DateRun> {
    let mut iter = dates.iter().copied();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut runs = Vec::new();
    let mut current = DateRun { start: first, end: first };
    for date in iter {
        if current.end.succ_opt() == Some(date) {
            current.end = date;
        } else {
            runs.push(current);
            current = DateRun { start: date, end: date };
        }
    }
    runs.push(current);
    runs
}

/// Reduce a sorted, deduplicated date set to a streak record.
///
/// The run containing the maximum date defines the current streak; there
/// is no recency expiry, so a lone entry from last month still anchors a
/// streak of one. `stored_longest` is the previously persisted maximum.
fn reduce_dates(user_id: Uuid, dates: &[NaiveDate], stored_longest: u32) -> StreakRecord {
    let runs = partition_runs(dates);
    let Some(last) = runs.last() else {
        // No entries: zero current streak, historical maximum persists.
        return StreakRecord {
            longest_streak: stored_longest,
            ..StreakRecord::zero(user_id)
        };
    };

    let longest_run = runs.iter().map(DateRun::len_days).max().unwrap_or(0);
    StreakRecord {
        user_id,
        current_streak: last.len_days(),
        longest_streak: longest_run.max(stored_longest),
        last_entry_date: Some(last.end),
        streak_start_date: Some(last.start),
    }
}

/// Recomputes and reads per-user writing-streak records.
///
/// Borrows a store that is both the entry directory and the streak row
/// store; [`crate::Database`] implements both. Recomputation is idempotent
/// and last-writer-wins per user: two racing recomputes may persist in
/// either order, and the next recompute self-heals any stale result.
pub struct StreakEngine<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> StreakEngine<'a, S>
where
    S: EntryDirectory + StreakStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Recompute the streak record from the user's current written dates
    /// and persist it.
    ///
    /// # Errors
    /// Returns an error only if the directory read or the row upsert
    /// fails; an empty date set is a valid zero state.
    pub fn recompute(&self, user_id: Uuid) -> Result<StreakRecord, CoreError> {
        let stored_longest = self
            .store
            .load_streak(user_id)?
            .map(|r| r.longest_streak)
            .unwrap_or(0);
        self.recompute_with_floor(user_id, stored_longest)
    }

    /// Recompute discarding the stored `longest_streak`.
    ///
    /// Normal recomputation keeps the historical maximum via `max()`, so a
    /// value inflated by a past bug would never come back down. This entry
    /// point rebuilds the record purely from current entry data, for use
    /// by reconciliation jobs.
    pub fn rebuild_from_zero(&self, user_id: Uuid) -> Result<StreakRecord, CoreError> {
        self.recompute_with_floor(user_id, 0)
    }

    fn recompute_with_floor(&self, user_id: Uuid, floor: u32) -> Result<StreakRecord, CoreError> {
        let mut dates = self.store.written_dates(user_id)?;
        dates.sort_unstable();
        dates.dedup();

        let record = reduce_dates(user_id, &dates, floor);
        self.store.upsert_streak(&record)?;
        Ok(record)
    }

    /// Read the last-persisted record without recomputing.
    ///
    /// Returns the zero-state record if no row exists yet. Callers that
    /// need freshness must have run `recompute` after the last mutation.
    pub fn get(&self, user_id: Uuid) -> Result<StreakRecord, CoreError> {
        Ok(self
            .store
            .load_streak(user_id)?
            .unwrap_or_else(|| StreakRecord::zero(user_id)))
    }
}
