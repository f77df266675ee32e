use crate::region::Region;
use serde::Deserialize;

/// Main configuration structure for Rift-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "region")]
    pub regions: Vec<Region>,
}

/// Remote API access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API key sent as the X-Riot-Token header. The RIOT_API_KEY
    /// environment variable overrides this when set.
    #[serde(default)]
    pub key: String,

    /// Per-call HTTP timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Attempt budget for transient failures
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Wait applied on HTTP 429 when the server sends no Retry-After
    #[serde(
        rename = "retry-after-fallback-secs",
        default = "default_retry_after_fallback"
    )]
    pub retry_after_fallback_secs: u64,

    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitSettings,
}

/// Dual sliding-window rate limit sizes
///
/// Defaults match the development key quota: 20 requests per second and
/// 100 requests per two minutes.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(rename = "burst-limit", default = "default_burst_limit")]
    pub burst_limit: usize,

    #[serde(rename = "burst-window-secs", default = "default_burst_window")]
    pub burst_window_secs: u64,

    #[serde(rename = "sustained-limit", default = "default_sustained_limit")]
    pub sustained_limit: usize,

    #[serde(rename = "sustained-window-secs", default = "default_sustained_window")]
    pub sustained_window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            burst_limit: default_burst_limit(),
            burst_window_secs: default_burst_window(),
            sustained_limit: default_sustained_limit(),
            sustained_window_secs: default_sustained_window(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Rank tier whose divisions are used to bootstrap the roster
    #[serde(default = "default_tier")]
    pub tier: String,

    /// Ordered divisions to page through during bootstrap
    #[serde(default = "default_divisions")]
    pub divisions: Vec<String>,

    /// Patch to harvest: "auto" samples recent matches to detect it,
    /// anything else is parsed as an explicit "major.minor" override
    #[serde(rename = "target-version", default = "default_target_version")]
    pub target_version: String,

    /// Queue ids accepted for persistence (420 = ranked solo queue)
    #[serde(rename = "queue-ids", default = "default_queue_ids")]
    pub queue_ids: Vec<i64>,

    /// Minimum match duration in seconds; filters remakes and early
    /// surrenders
    #[serde(rename = "min-duration-secs", default = "default_min_duration")]
    pub min_duration_secs: i64,

    /// Match-id page size requested per player per round
    #[serde(rename = "ids-page-size", default = "default_ids_page_size")]
    pub ids_page_size: usize,

    /// Delay between scrape rounds
    #[serde(rename = "round-delay-secs", default = "default_round_delay")]
    pub round_delay_secs: u64,

    /// Delay between credential re-checks while a worker is paused
    #[serde(rename = "pause-delay-secs", default = "default_pause_delay")]
    pub pause_delay_secs: u64,

    /// Delay before retrying a round after an unexpected failure
    #[serde(rename = "error-delay-secs", default = "default_error_delay")]
    pub error_delay_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_after_fallback() -> u64 {
    5
}

fn default_burst_limit() -> usize {
    20
}

fn default_burst_window() -> u64 {
    1
}

fn default_sustained_limit() -> usize {
    100
}

fn default_sustained_window() -> u64 {
    120
}

fn default_tier() -> String {
    "DIAMOND".to_string()
}

fn default_divisions() -> Vec<String> {
    vec![
        "I".to_string(),
        "II".to_string(),
        "III".to_string(),
        "IV".to_string(),
    ]
}

fn default_target_version() -> String {
    "auto".to_string()
}

fn default_queue_ids() -> Vec<i64> {
    vec![420]
}

fn default_min_duration() -> i64 {
    300
}

fn default_ids_page_size() -> usize {
    20
}

fn default_round_delay() -> u64 {
    5
}

fn default_pause_delay() -> u64 {
    30
}

fn default_error_delay() -> u64 {
    10
}
