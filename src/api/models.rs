//! Remote API payload models
//!
//! Only the fields the crawl logic reads are typed; full match payloads
//! are carried alongside as opaque JSON and persisted verbatim.

use crate::patch::GameVersion;
use serde::Deserialize;

/// One entry from the ranked league listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntry {
    pub puuid: String,
    #[serde(default)]
    pub league_points: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
}

/// Typed view over a match payload
#[derive(Debug, Clone, Deserialize)]
pub struct MatchDetail {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub match_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    /// Creation time in milliseconds since epoch
    pub game_creation: i64,

    /// Duration in seconds
    pub game_duration: i64,

    /// Full version string, e.g. "14.24.638.2387"
    pub game_version: String,

    pub queue_id: i64,
}

impl MatchDetail {
    /// Patch this match was played on, if the version string parses
    pub fn version(&self) -> Option<GameVersion> {
        GameVersion::from_full(&self.info.game_version)
    }

    /// Creation time in whole seconds since epoch
    pub fn game_creation_secs(&self) -> i64 {
        self.info.game_creation / 1000
    }
}

/// A match as fetched: the typed view plus the verbatim payload
#[derive(Debug, Clone)]
pub struct FetchedMatch {
    pub detail: MatchDetail,
    pub raw: serde_json::Value,
}
