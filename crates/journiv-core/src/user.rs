//! Per-user settings.
//!
//! Identity, credentials, and OIDC provisioning live outside this crate;
//! the only setting the core needs is the preferred timezone, used as the
//! fallback when an entry is created without one. Changing it never
//! rewrites the dates of already-stored entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settings row for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: Uuid,
    /// IANA timezone name. Fallback for entries created without one.
    pub time_zone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub fn new(user_id: Uuid, time_zone: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            time_zone: time_zone.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
