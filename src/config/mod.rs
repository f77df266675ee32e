//! Configuration loading and validation
//!
//! Configuration is a TOML file with kebab-case keys: API access and rate
//! limit sizes, crawl behavior (tier, divisions, target patch, filters,
//! delays), the output database path, and one `[[region]]` table per
//! crawled region.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{ApiConfig, Config, CrawlConfig, OutputConfig, RateLimitSettings};
pub use validation::validate;
