//! Rift-Harvest: a ranked match harvester
//!
//! This crate implements a crawler that continuously harvests ranked match
//! records from the Riot API across independent geographic regions,
//! deduplicates them by match identifier, and persists them to a local
//! database. One worker runs per region; all workers share a single
//! credential health flag that pauses the crawl while the API key is bad.

pub mod api;
pub mod config;
pub mod crawler;
pub mod credential;
pub mod patch;
pub mod region;
pub mod storage;

use thiserror::Error;

/// Main error type for Rift-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task error: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Rift-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use credential::{CredentialHealth, CredentialStatus};
pub use patch::GameVersion;
pub use region::Region;
