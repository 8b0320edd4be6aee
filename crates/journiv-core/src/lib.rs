//! # Journiv Core Library
//!
//! This library provides the core business logic for the Journiv personal
//! journaling backend: journals, dated entries, and per-user writing-streak
//! analytics. Transport layers (HTTP, CLI) and identity management sit
//! above this crate and are out of scope here.
//!
//! ## Architecture
//!
//! - **Streak Engine**: Recomputes the per-user streak record from scratch
//!   after every date-affecting entry mutation, by partitioning the user's
//!   distinct written dates into runs of consecutive days
//! - **Entry Lifecycle**: Create/update/delete with timestamp
//!   normalization; each entry keeps the timezone it was written in, and
//!   its calendar date never shifts afterwards
//! - **Storage**: SQLite-based persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`StreakEngine`]: Date-set reduction and streak record persistence
//! - [`EntryService`]: Entry lifecycle over a [`Database`]
//! - [`Database`]: Journals, entries, settings, and streak rows
//! - [`Config`]: Application configuration management

pub mod entry;
pub mod error;
pub mod journal;
pub mod storage;
pub mod streak;
pub mod user;

pub use entry::{Entry, EntryPatch, EntryService, NewEntry};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use journal::Journal;
pub use storage::{Config, Database, PaginationConfig};
pub use streak::{EntryDirectory, StreakEngine, StreakRecord, StreakStore};
pub use user::UserSettings;
