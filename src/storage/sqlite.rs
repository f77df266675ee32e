//! SQLite storage implementation

use crate::patch::GameVersion;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{PlayerRecord, RegionTotalRecord};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at the given path
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    // ===== Players =====

    fn upsert_player(&mut self, puuid: &str, platform: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO players (puuid, platform, match_offset, discovered_at)
             VALUES (?1, ?2, 0, ?3)",
            params![puuid, platform, now],
        )?;
        Ok(())
    }

    fn list_players(&self, platform: &str) -> StorageResult<Vec<PlayerRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT puuid, platform, match_offset FROM players
             WHERE platform = ?1 ORDER BY id",
        )?;

        let players = stmt
            .query_map(params![platform], |row| {
                Ok(PlayerRecord {
                    puuid: row.get(0)?,
                    platform: row.get(1)?,
                    match_offset: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(players)
    }

    fn update_player_offset(
        &mut self,
        puuid: &str,
        platform: &str,
        offset: u64,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE players SET match_offset = ?1 WHERE puuid = ?2 AND platform = ?3",
            params![offset as i64, puuid, platform],
        )?;
        Ok(())
    }

    // ===== Matches =====

    fn match_exists(&self, match_id: &str) -> StorageResult<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM matches WHERE match_id = ?1",
                params![match_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    fn insert_match(
        &mut self,
        match_id: &str,
        version: &GameVersion,
        game_creation: i64,
        payload: &serde_json::Value,
    ) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(payload)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO matches
             (match_id, game_version, game_creation, payload, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![match_id, version.to_string(), game_creation, body, now],
        )?;
        Ok(inserted > 0)
    }

    fn count_matches(&self, version: Option<&GameVersion>) -> StorageResult<u64> {
        let count: i64 = match version {
            Some(version) => self.conn.query_row(
                "SELECT COUNT(*) FROM matches WHERE game_version = ?1",
                params![version.to_string()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn min_match_timestamp(&self, version: &GameVersion) -> StorageResult<Option<i64>> {
        let min: Option<i64> = self.conn.query_row(
            "SELECT MIN(game_creation) FROM matches WHERE game_version = ?1",
            params![version.to_string()],
            |row| row.get(0),
        )?;
        Ok(min)
    }

    // ===== Aggregates =====

    fn upsert_region_total(&mut self, platform: &str, total: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO region_totals (platform, total_matches, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(platform) DO UPDATE SET
                 total_matches = excluded.total_matches,
                 updated_at = excluded.updated_at",
            params![platform, total as i64, now],
        )?;
        Ok(())
    }

    fn list_region_totals(&self) -> StorageResult<Vec<RegionTotalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT platform, total_matches, updated_at FROM region_totals ORDER BY platform",
        )?;

        let totals = stmt
            .query_map([], |row| {
                Ok(RegionTotalRecord {
                    platform: row.get(0)?,
                    total_matches: row.get::<_, i64>(1)? as u64,
                    updated_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(totals)
    }
}
