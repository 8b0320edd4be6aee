//! Journal entries and local-date derivation.
//!
//! Every entry stores a UTC instant together with the IANA timezone name
//! it was written in. The entry's calendar date is derived from that pair
//! at write time and never shifts afterwards, even if the user later
//! changes their timezone preference.

mod service;

pub use service::EntryService;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono::offset::LocalResult;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, ValidationError};

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub word_count: u32,
    /// Local calendar date, derived from `entry_datetime_utc` in
    /// `entry_timezone`. Input to the streak engine.
    pub entry_date: NaiveDate,
    pub entry_datetime_utc: DateTime<Utc>,
    /// IANA timezone name recorded at creation/update time.
    pub entry_timezone: String,
    pub location: Option<String>,
    pub weather: Option<String>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEntry {
    pub journal_id: Uuid,
    pub title: String,
    pub content: String,
    /// Explicit local calendar date; combined with the current local time
    /// in the entry timezone when no instant is given.
    pub entry_date: Option<NaiveDate>,
    pub entry_datetime_utc: Option<DateTime<Utc>>,
    /// Falls back to the user's preferred timezone, then UTC.
    pub entry_timezone: Option<String>,
    pub location: Option<String>,
    pub weather: Option<String>,
}

/// Partial update for an entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    pub journal_id: Option<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub entry_datetime_utc: Option<DateTime<Utc>>,
    pub entry_timezone: Option<String>,
    pub location: Option<String>,
    pub weather: Option<String>,
    pub is_pinned: Option<bool>,
}

/// The result of normalizing entry timestamp inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTimestamp {
    pub datetime_utc: DateTime<Utc>,
    pub timezone: String,
    pub date: NaiveDate,
}

/// Whitespace-delimited word count of entry content.
pub fn word_count(content: &str) -> u32 {
    content.split_whitespace().count() as u32
}

/// Resolve the timezone name to use: explicit value, then fallback, then UTC.
/// Blank values collapse to UTC.
pub fn normalize_timezone_name(explicit: Option<&str>, fallback: &str) -> String {
    let name = explicit.unwrap_or(fallback).trim();
    if name.is_empty() {
        "UTC".to_string()
    } else {
        name.to_string()
    }
}

/// Parse an IANA timezone name.
///
/// # Errors
/// Returns [`ValidationError::UnknownTimezone`] if the name is not in the
/// timezone database.
pub fn parse_timezone(name: &str) -> Result<Tz, CoreError> {
    name.parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone(name.to_string()).into())
}

/// Derive the local calendar date of a UTC instant in the given timezone.
pub fn local_date_for(instant: DateTime<Utc>, timezone_name: &str) -> Result<NaiveDate, CoreError> {
    let tz = parse_timezone(timezone_name)?;
    Ok(instant.with_timezone(&tz).date_naive())
}

/// Map a local wall-clock datetime to UTC.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant;
/// nonexistent local times (DST spring-forward gap) are interpreted as if
/// the wall clock were UTC.
fn local_datetime_to_utc(local: NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&local),
    }
}

/// Normalize the timestamp inputs of an entry into a stored instant,
/// timezone name, and derived local date.
///
/// Priority: an explicit UTC instant wins; otherwise an explicit local
/// date is combined with the current local time in the entry timezone;
/// otherwise the current instant is used.
pub fn normalize_timestamp(
    entry_date: Option<NaiveDate>,
    entry_datetime_utc: Option<DateTime<Utc>>,
    entry_timezone: Option<&str>,
    fallback_timezone: &str,
) -> Result<NormalizedTimestamp, CoreError> {
    normalize_timestamp_at(
        entry_date,
        entry_datetime_utc,
        entry_timezone,
        fallback_timezone,
        Utc::now(),
    )
}

fn normalize_timestamp_at(
    entry_date: Option<NaiveDate>,
    entry_datetime_utc: Option<DateTime<Utc>>,
    entry_timezone: Option<&str>,
    fallback_timezone: &str,
    now: DateTime<Utc>,
) -> Result<NormalizedTimestamp, CoreError> {
    let timezone = normalize_timezone_name(entry_timezone, fallback_timezone);
    let tz = parse_timezone(&timezone)?;

    let datetime_utc = if let Some(instant) = entry_datetime_utc {
        instant
    } else if let Some(date) = entry_date {
        let local_time = now.with_timezone(&tz).time();
        local_datetime_to_utc(date.and_time(local_time), &tz)
    } else {
        now
    };

    let date = datetime_utc.with_timezone(&tz).date_naive();
    Ok(NormalizedTimestamp {
        datetime_utc,
        timezone,
        date,
    })
}

/// Shift an entry's instant to a new local calendar date, keeping the
/// current local wall-clock time in the entry's timezone.
pub fn shift_to_local_date(
    instant: DateTime<Utc>,
    timezone_name: &str,
    target_date: NaiveDate,
) -> Result<DateTime<Utc>, CoreError> {
    let tz = parse_timezone(timezone_name)?;
    let local_time = instant.with_timezone(&tz).time();
    Ok(local_datetime_to_utc(target_date.and_time(local_time), &tz))
}
