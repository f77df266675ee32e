//! Storage module for persisting harvest data
//!
//! Handles the player roster, the deduplicated match set, and the
//! per-region aggregate counters. The crawl core depends only on the
//! `Storage` trait; `SqliteStorage` is the shipped backend.

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// A roster entry: one player in one region
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub puuid: String,
    pub platform: String,

    /// Count of match ids already requested for this player. Only ever
    /// advances, and by the number of ids returned rather than the
    /// number accepted after filtering.
    pub match_offset: u64,
}

/// Aggregate match counter for one region
#[derive(Debug, Clone)]
pub struct RegionTotalRecord {
    pub platform: String,
    pub total_matches: u64,
    pub updated_at: String,
}
