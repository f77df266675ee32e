//! Rate-limited remote API access
//!
//! This module owns everything between the crawl logic and the wire:
//! - request pacing against both quota windows (limiter)
//! - one closed status-code classification (classify)
//! - typed payload views (models)
//! - the client applying the retry/backoff/breaker policy (client)

mod classify;
mod client;
mod limiter;
mod models;

pub use classify::{classify_status, retry_after_header, ResponseClass};
pub use client::{build_http_client, ApiClient, ApiError};
pub use limiter::RequestWindow;
pub use models::{FetchedMatch, LeagueEntry, MatchDetail, MatchInfo, MatchMetadata};
