//! Rate-limited API client
//!
//! Wraps every outbound call with the dual-window limiter, the shared
//! credential breaker, and one retry/backoff policy expressed over
//! [`ResponseClass`](super::classify::ResponseClass):
//!
//! | Class | Action |
//! |-------|--------|
//! | breaker open | fail with CredentialInvalid before any network work |
//! | 401 | open the breaker, fail with CredentialInvalid |
//! | 403 | log, return empty (never opens the breaker) |
//! | 429 | wait Retry-After (fallback 5s), retry without consuming an attempt |
//! | 404 | return empty |
//! | other / network error | up to 3 attempts, linear backoff, then empty |
//! | 2xx | close the breaker, return the payload |
//!
//! Callers treat an empty result as "try again next round", never as
//! fatal. All waits race the shutdown signal so a stopping worker never
//! sits out a full rate-limit sleep.

use crate::api::classify::{classify_status, retry_after_header, ResponseClass};
use crate::api::limiter::RequestWindow;
use crate::api::models::{FetchedMatch, LeagueEntry, MatchDetail};
use crate::config::Config;
use crate::credential::CredentialHealth;
use crate::region::Region;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Header carrying the per-process API secret
const AUTH_HEADER: &str = "X-Riot-Token";

/// Queue name used for the ranked entries listing
const ENTRIES_QUEUE: &str = "RANKED_SOLO_5x5";

/// Errors an API call can surface to a worker
///
/// Everything else degrades to an empty result inside the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("API credential is invalid")]
    CredentialInvalid,

    #[error("shutdown requested")]
    Stopped,
}

/// Builds the underlying HTTP client with the fixed call timeout
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// One region's rate-limited view of the remote API
///
/// Each region worker owns its own client (and therefore its own request
/// history) because each region has an independent quota. The credential
/// breaker is the only shared piece.
pub struct ApiClient {
    http: Client,
    key: String,
    limiter: RequestWindow,
    credential: Arc<CredentialHealth>,
    region: Region,
    retry_attempts: u32,
    retry_after_fallback: Duration,
    stop: watch::Receiver<bool>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        region: Region,
        credential: Arc<CredentialHealth>,
        stop: watch::Receiver<bool>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http_client(config.api.request_timeout_secs)?,
            key: config.api.key.clone(),
            limiter: RequestWindow::new(&config.api.rate_limit),
            credential,
            region,
            retry_attempts: config.api.retry_attempts,
            retry_after_fallback: Duration::from_secs(config.api.retry_after_fallback_secs),
            stop,
        })
    }

    /// Fetches a page of ranked entries for (tier, division)
    pub async fn league_entries(
        &mut self,
        tier: &str,
        division: &str,
        page: u32,
    ) -> Result<Vec<LeagueEntry>, ApiError> {
        let url = format!(
            "{}/lol/league/v4/entries/{}/{}/{}?page={}",
            self.region.platform_url(),
            ENTRIES_QUEUE,
            tier,
            division,
            page
        );

        match self.get_json(&url).await? {
            Some(value) => Ok(decode_or_empty(value, &url)),
            None => Ok(Vec::new()),
        }
    }

    /// Fetches a page of match identifiers for a player
    ///
    /// `start` is the player's pagination offset; `start_time`/`end_time`
    /// are inclusive epoch-second bounds on match creation.
    pub async fn match_ids(
        &mut self,
        puuid: &str,
        start: u64,
        count: usize,
        start_time: Option<i64>,
        end_time: Option<i64>,
        queue: Option<i64>,
    ) -> Result<Vec<String>, ApiError> {
        let mut url = format!(
            "{}/lol/match/v5/matches/by-puuid/{}/ids?start={}&count={}",
            self.region.cluster_url(),
            puuid,
            start,
            count
        );
        if let Some(ts) = start_time {
            url.push_str(&format!("&startTime={ts}"));
        }
        if let Some(ts) = end_time {
            url.push_str(&format!("&endTime={ts}"));
        }
        if let Some(queue) = queue {
            url.push_str(&format!("&queue={queue}"));
        }

        match self.get_json(&url).await? {
            Some(value) => Ok(decode_or_empty(value, &url)),
            None => Ok(Vec::new()),
        }
    }

    /// Fetches full match detail by identifier
    ///
    /// Returns None both for a genuinely missing match and for one whose
    /// payload does not carry the fields the crawl needs.
    pub async fn match_detail(&mut self, match_id: &str) -> Result<Option<FetchedMatch>, ApiError> {
        let url = format!(
            "{}/lol/match/v5/matches/{}",
            self.region.cluster_url(),
            match_id
        );

        match self.get_json(&url).await? {
            Some(raw) => match serde_json::from_value::<MatchDetail>(raw.clone()) {
                Ok(detail) => Ok(Some(FetchedMatch { detail, raw })),
                Err(e) => {
                    tracing::warn!("Malformed match payload for {}: {}", match_id, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Lightweight liveness probe against the platform status endpoint
    ///
    /// Unlike every other call this bypasses the breaker gate: it is the
    /// call the re-validation task uses to close the breaker. A single
    /// attempt, still rate limited.
    pub async fn probe(&mut self) -> bool {
        let url = format!("{}/lol/status/v4/platform-data", self.region.platform_url());

        if self.acquire_slot().await.is_err() {
            return false;
        }

        match self.http.get(&url).header(AUTH_HEADER, &self.key).send().await {
            Ok(response) if response.status().is_success() => {
                self.credential.mark_valid();
                true
            }
            Ok(response) => {
                tracing::debug!("Probe returned status {}", response.status());
                false
            }
            Err(e) => {
                tracing::debug!("Probe failed: {}", e);
                false
            }
        }
    }

    /// Performs one logical GET with the full policy applied
    ///
    /// Ok(None) means "no data for this call" in all its forms: 404, the
    /// ambiguous 403, or an exhausted retry budget.
    async fn get_json(&mut self, url: &str) -> Result<Option<serde_json::Value>, ApiError> {
        if !self.credential.is_valid() {
            return Err(ApiError::CredentialInvalid);
        }

        let mut attempt: u32 = 1;
        loop {
            self.acquire_slot().await?;

            match self.http.get(url).header(AUTH_HEADER, &self.key).send().await {
                Ok(response) => {
                    let retry_after = retry_after_header(&response);
                    match classify_status(response.status(), retry_after) {
                        ResponseClass::Success => {
                            match response.json::<serde_json::Value>().await {
                                Ok(value) => {
                                    self.credential.mark_valid();
                                    return Ok(Some(value));
                                }
                                Err(e) => {
                                    // Truncated body; retry like any
                                    // transient failure
                                    tracing::warn!("Failed to read body from {}: {}", url, e);
                                }
                            }
                        }

                        ResponseClass::AuthMissing => {
                            self.credential.mark_invalid();
                            return Err(ApiError::CredentialInvalid);
                        }

                        ResponseClass::Ambiguous => {
                            tracing::warn!(
                                "Got 403 from {} (bad key or bad path), treating as empty",
                                url
                            );
                            return Ok(None);
                        }

                        ResponseClass::NotFound => return Ok(None),

                        ResponseClass::RateLimited { retry_after } => {
                            let wait = retry_after.unwrap_or(self.retry_after_fallback);
                            tracing::debug!("Rate limited by server, waiting {:?}", wait);
                            self.wait(wait).await?;
                            // A server-side rate limit does not consume an
                            // attempt
                            continue;
                        }

                        ResponseClass::Transient(code) => {
                            tracing::warn!(
                                "Unexpected status {} from {} (attempt {}/{})",
                                code,
                                url,
                                attempt,
                                self.retry_attempts
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Network error for {} (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.retry_attempts,
                        e
                    );
                }
            }

            if attempt >= self.retry_attempts {
                tracing::warn!("Giving up on {} after {} attempts", url, attempt);
                return Ok(None);
            }

            // Linear backoff: attempt_index seconds between attempts
            self.wait(Duration::from_secs(attempt as u64)).await?;
            attempt += 1;
        }
    }

    /// Acquires a rate-limit slot, racing the shutdown signal
    async fn acquire_slot(&mut self) -> Result<(), ApiError> {
        tokio::select! {
            _ = self.limiter.acquire() => Ok(()),
            _ = self.stop.wait_for(|stopped| *stopped) => Err(ApiError::Stopped),
        }
    }

    /// Sleeps, racing the shutdown signal
    async fn wait(&mut self, duration: Duration) -> Result<(), ApiError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.stop.wait_for(|stopped| *stopped) => Err(ApiError::Stopped),
        }
    }
}

/// Decodes a JSON payload into the expected type, degrading to empty on a
/// shape mismatch
fn decode_or_empty<T: serde::de::DeserializeOwned>(value: serde_json::Value, url: &str) -> Vec<T>
where
    Vec<T>: serde::de::DeserializeOwned,
{
    match serde_json::from_value(value) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Unexpected payload shape from {}: {}", url, e);
            Vec::new()
        }
    }
}
