//! Region descriptors
//!
//! A region is an independently rate-limited deployment boundary of the
//! Riot API. Platform hosts (`na1`, `euw1`, ...) serve league entries and
//! the status probe; routing cluster hosts (`americas`, `europe`, ...)
//! serve match ids and match detail. Regions are loaded from configuration
//! at startup and never change while the process runs.

use serde::Deserialize;

/// Static descriptor for one crawled region
#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    /// Platform identifier (e.g. "na1", "euw1", "kr")
    pub platform: String,

    /// Routing cluster identifier (e.g. "americas", "europe", "asia")
    pub cluster: String,

    /// Human-readable display name
    pub name: String,

    /// Override for the platform host base URL (used by tests)
    #[serde(default, rename = "platform-base-url")]
    pub platform_base_url: Option<String>,

    /// Override for the cluster host base URL (used by tests)
    #[serde(default, rename = "cluster-base-url")]
    pub cluster_base_url: Option<String>,
}

impl Region {
    /// Base URL for platform-routed endpoints (league entries, status probe)
    pub fn platform_url(&self) -> String {
        match &self.platform_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.riotgames.com", self.platform),
        }
    }

    /// Base URL for cluster-routed endpoints (match ids, match detail)
    pub fn cluster_url(&self) -> String {
        match &self.cluster_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.riotgames.com", self.cluster),
        }
    }
}
