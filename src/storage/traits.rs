//! Storage trait and error types
//!
//! The crawl core only ever talks to this trait (the persistence port);
//! the SQLite implementation lives in the sibling module. Implementations
//! must give insert-if-absent semantics for players and matches so
//! concurrent or repeated fetches stay idempotent.

use crate::patch::GameVersion;
use crate::storage::{PlayerRecord, RegionTotalRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Players =====

    /// Inserts a player for a region; no-op if already present
    ///
    /// Player identifiers are unique per region, not globally.
    fn upsert_player(&mut self, puuid: &str, platform: &str) -> StorageResult<()>;

    /// Lists all known players for a region in insertion order
    fn list_players(&self, platform: &str) -> StorageResult<Vec<PlayerRecord>>;

    /// Replaces a player's stored pagination offset
    fn update_player_offset(
        &mut self,
        puuid: &str,
        platform: &str,
        offset: u64,
    ) -> StorageResult<()>;

    // ===== Matches =====

    /// Checks whether a match identifier is already stored
    fn match_exists(&self, match_id: &str) -> StorageResult<bool>;

    /// Inserts a match keyed by its identifier; no-op if present
    ///
    /// `game_creation` is the creation time from the payload in epoch
    /// seconds, stored denormalized so boundary lookups stay cheap.
    /// Returns whether the row was newly inserted.
    fn insert_match(
        &mut self,
        match_id: &str,
        version: &GameVersion,
        game_creation: i64,
        payload: &serde_json::Value,
    ) -> StorageResult<bool>;

    /// Counts stored matches, optionally restricted to one patch
    fn count_matches(&self, version: Option<&GameVersion>) -> StorageResult<u64>;

    /// Earliest stored creation timestamp among matches of a patch
    fn min_match_timestamp(&self, version: &GameVersion) -> StorageResult<Option<i64>>;

    // ===== Aggregates =====

    /// Upserts the per-region total-match counter with a last-updated
    /// marker
    fn upsert_region_total(&mut self, platform: &str, total: u64) -> StorageResult<()>;

    /// Lists all per-region counters (for the stats command)
    fn list_region_totals(&self) -> StorageResult<Vec<RegionTotalRecord>>;
}
