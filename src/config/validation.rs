use crate::config::types::{ApiConfig, Config, CrawlConfig, OutputConfig, RateLimitSettings};
use crate::patch::GameVersion;
use crate::region::Region;
use crate::ConfigError;
use std::collections::HashSet;

const KNOWN_CLUSTERS: &[&str] = &["americas", "europe", "asia", "sea"];
const KNOWN_DIVISIONS: &[&str] = &["I", "II", "III", "IV"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    validate_regions(&config.regions)?;
    Ok(())
}

/// Validates API access configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if config.key.is_empty() {
        return Err(ConfigError::Validation(
            "api.key cannot be empty (set it in the config file or via RIOT_API_KEY)".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry-attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    validate_rate_limits(&config.rate_limit)?;

    Ok(())
}

/// Validates rate limit window sizes
fn validate_rate_limits(limits: &RateLimitSettings) -> Result<(), ConfigError> {
    if limits.burst_limit < 1 || limits.sustained_limit < 1 {
        return Err(ConfigError::Validation(
            "rate-limit counts must be >= 1".to_string(),
        ));
    }

    if limits.burst_window_secs < 1 || limits.sustained_window_secs < 1 {
        return Err(ConfigError::Validation(
            "rate-limit windows must be >= 1 second".to_string(),
        ));
    }

    if limits.burst_window_secs >= limits.sustained_window_secs {
        return Err(ConfigError::Validation(format!(
            "burst-window-secs ({}) must be shorter than sustained-window-secs ({})",
            limits.burst_window_secs, limits.sustained_window_secs
        )));
    }

    Ok(())
}

/// Validates crawl behavior configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.tier.is_empty() {
        return Err(ConfigError::Validation("tier cannot be empty".to_string()));
    }

    if config.divisions.is_empty() {
        return Err(ConfigError::Validation(
            "divisions cannot be empty".to_string(),
        ));
    }

    for division in &config.divisions {
        if !KNOWN_DIVISIONS.contains(&division.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown division '{}', expected one of {:?}",
                division, KNOWN_DIVISIONS
            )));
        }
    }

    if config.target_version != "auto" && config.target_version.parse::<GameVersion>().is_err() {
        return Err(ConfigError::Validation(format!(
            "target-version must be \"auto\" or \"major.minor\", got '{}'",
            config.target_version
        )));
    }

    if config.queue_ids.is_empty() {
        return Err(ConfigError::Validation(
            "queue-ids cannot be empty".to_string(),
        ));
    }

    // The match-id endpoint caps count at 100
    if config.ids_page_size < 1 || config.ids_page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "ids-page-size must be between 1 and 100, got {}",
            config.ids_page_size
        )));
    }

    if config.min_duration_secs < 0 {
        return Err(ConfigError::Validation(format!(
            "min-duration-secs must be >= 0, got {}",
            config.min_duration_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates region entries
fn validate_regions(regions: &[Region]) -> Result<(), ConfigError> {
    if regions.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[region]] must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for region in regions {
        if region.platform.is_empty() {
            return Err(ConfigError::Validation(
                "region platform cannot be empty".to_string(),
            ));
        }

        if !seen.insert(region.platform.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate region platform '{}'",
                region.platform
            )));
        }

        // Only enforce known clusters on real hosts; test overrides may
        // point anywhere.
        if region.cluster_base_url.is_none() && !KNOWN_CLUSTERS.contains(&region.cluster.as_str())
        {
            return Err(ConfigError::Validation(format!(
                "unknown routing cluster '{}' for region '{}', expected one of {:?}",
                region.cluster, region.platform, KNOWN_CLUSTERS
            )));
        }
    }

    Ok(())
}
