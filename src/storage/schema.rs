//! Database schema definitions
//!
//! All SQL schema for the harvest database lives here.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Player roster, one row per (puuid, region)
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    puuid TEXT NOT NULL,
    platform TEXT NOT NULL,
    match_offset INTEGER NOT NULL DEFAULT 0,
    discovered_at TEXT NOT NULL,
    UNIQUE(puuid, platform)
);

CREATE INDEX IF NOT EXISTS idx_players_platform ON players(platform);

-- Harvested matches, keyed by the globally unique match identifier
CREATE TABLE IF NOT EXISTS matches (
    match_id TEXT PRIMARY KEY,
    game_version TEXT NOT NULL,
    game_creation INTEGER NOT NULL,
    payload TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_matches_version ON matches(game_version);
CREATE INDEX IF NOT EXISTS idx_matches_version_creation
    ON matches(game_version, game_creation);

-- Aggregate per-region counters
CREATE TABLE IF NOT EXISTS region_totals (
    platform TEXT PRIMARY KEY,
    total_matches INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
