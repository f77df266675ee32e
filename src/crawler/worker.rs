//! Region worker - one region's crawl lifecycle
//!
//! A worker owns a single region end to end: bootstrapping the player
//! roster from the ranked ladder, resolving the target patch, locating
//! the timestamp boundary where the patch began, and then looping scrape
//! rounds over the roster forever. Workers never talk to each other; the
//! only state they share is the credential breaker.
//!
//! The loop is crash- and pause-resilient by construction: every player
//! carries a persisted pagination offset, so an abandoned round is simply
//! re-run and skips everything already covered.

use crate::api::{ApiClient, ApiError, MatchDetail};
use crate::config::{Config, CrawlConfig};
use crate::credential::CredentialHealth;
use crate::patch::{select_target_version, GameVersion, EARLIEST_VALID_TIMESTAMP};
use crate::region::Region;
use crate::storage::{PlayerRecord, Storage, StorageError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Players sampled for patch auto-detection
const SAMPLE_PLAYERS: usize = 5;

/// Recent matches walked during boundary discovery
const BOUNDARY_SAMPLE: usize = 20;

/// Errors that can abort a single scrape round
///
/// None of these abort the worker: the run loop pauses on credential
/// failure, exits on stop, and sleep-retries everything else.
#[derive(Debug, Error)]
pub enum RoundError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Crawl worker for one region
pub struct RegionWorker<S: Storage> {
    region: Region,
    config: Arc<Config>,
    client: ApiClient,
    storage: Arc<Mutex<S>>,
    credential: Arc<CredentialHealth>,
    stop: watch::Receiver<bool>,

    /// Patch being harvested; None disables version filtering
    target_version: Option<GameVersion>,

    /// Earliest known creation time of a target-patch match, passed as a
    /// lower bound on id listings once discovered
    boundary_ts: Option<i64>,

    /// One-shot flags: both searches run at most once per process
    /// lifetime regardless of outcome
    target_resolved: bool,
    boundary_searched: bool,

    /// Numerically greatest patch observed so far (logging only)
    latest_seen: Option<GameVersion>,
}

impl<S: Storage> RegionWorker<S> {
    pub fn new(
        config: Arc<Config>,
        region: Region,
        client: ApiClient,
        storage: Arc<Mutex<S>>,
        credential: Arc<CredentialHealth>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            region,
            config,
            client,
            storage,
            credential,
            stop,
            target_version: None,
            boundary_ts: None,
            target_resolved: false,
            boundary_searched: false,
            latest_seen: None,
        }
    }

    /// Runs the worker until the stop signal flips
    ///
    /// Round outcomes map to delays: a clean round sleeps the round
    /// delay, an invalid credential parks the worker on the pause delay,
    /// and anything unexpected is logged and retried after the error
    /// delay. Nothing propagates out of this loop.
    pub async fn run(&mut self) {
        tracing::info!(
            "Starting worker for {} ({})",
            self.region.name,
            self.region.platform
        );

        let round_delay = Duration::from_secs(self.config.crawl.round_delay_secs);
        let pause_delay = Duration::from_secs(self.config.crawl.pause_delay_secs);
        let error_delay = Duration::from_secs(self.config.crawl.error_delay_secs);

        loop {
            if self.stopped() {
                break;
            }

            if !self.credential.is_valid() {
                tracing::debug!("{}: paused while credential is invalid", self.region.platform);
                if self.idle(pause_delay).await {
                    break;
                }
                continue;
            }

            match self.run_once().await {
                Ok(()) => {
                    if self.idle(round_delay).await {
                        break;
                    }
                }
                Err(RoundError::Api(ApiError::Stopped)) => break,
                Err(RoundError::Api(ApiError::CredentialInvalid)) => {
                    // Next iteration lands in the pause branch
                    continue;
                }
                Err(RoundError::Storage(e)) => {
                    tracing::error!("{}: round failed: {}", self.region.platform, e);
                    if self.idle(error_delay).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Worker for {} stopped", self.region.platform);
    }

    /// Performs one full scrape round
    ///
    /// Bootstraps the roster and resolves the target patch on the first
    /// pass, then walks every player's next id page and finishes by
    /// refreshing the region's aggregate counter. Public so a single
    /// round can be driven directly (the `--once` CLI mode and the
    /// integration tests).
    pub async fn run_once(&mut self) -> Result<(), RoundError> {
        self.bootstrap_roster().await?;
        self.resolve_target_version().await?;
        self.discover_boundary().await?;

        let players = {
            let storage = self.storage.lock().unwrap();
            storage.list_players(&self.region.platform)?
        };
        tracing::debug!(
            "{}: scraping round over {} players",
            self.region.platform,
            players.len()
        );

        for player in &players {
            if self.stopped() {
                return Ok(());
            }
            if !self.credential.is_valid() {
                // The run loop owns pausing; just abandon the round. The
                // per-player offsets make the re-run cheap.
                return Err(RoundError::Api(ApiError::CredentialInvalid));
            }

            self.scrape_player(player).await?;
        }

        let total = {
            let storage = self.storage.lock().unwrap();
            storage.count_matches(self.target_version.as_ref())?
        };
        {
            let mut storage = self.storage.lock().unwrap();
            storage.upsert_region_total(&self.region.platform, total)?;
        }

        tracing::info!(
            "{}: round complete, {} matches stored for patch {}",
            self.region.platform,
            total,
            self.target_version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "any".to_string())
        );

        Ok(())
    }

    /// Fills an empty roster by paging the configured tier's divisions
    ///
    /// Pages each division in order until an empty page comes back.
    /// Inserts are idempotent, so re-running bootstrap after a partial
    /// failure only adds what is missing.
    async fn bootstrap_roster(&mut self) -> Result<(), RoundError> {
        let known = {
            let storage = self.storage.lock().unwrap();
            storage.list_players(&self.region.platform)?.len()
        };
        if known > 0 {
            return Ok(());
        }

        let tier = self.config.crawl.tier.clone();
        let divisions = self.config.crawl.divisions.clone();
        tracing::info!(
            "{}: bootstrapping roster from {} {:?}",
            self.region.platform,
            tier,
            divisions
        );

        let mut seen = 0usize;
        for division in &divisions {
            let mut page = 1u32;
            loop {
                if self.stopped() {
                    return Ok(());
                }

                let entries = self.client.league_entries(&tier, division, page).await?;
                if entries.is_empty() {
                    break;
                }

                {
                    let mut storage = self.storage.lock().unwrap();
                    for entry in &entries {
                        storage.upsert_player(&entry.puuid, &self.region.platform)?;
                    }
                }
                seen += entries.len();
                page += 1;
            }
        }

        tracing::info!(
            "{}: roster bootstrap finished, {} entries seen",
            self.region.platform,
            seen
        );
        Ok(())
    }

    /// Resolves the target patch (first round only)
    ///
    /// A configured override wins. Otherwise samples the most recent
    /// match of the first few players and picks the numerically greatest
    /// patch among them. An empty sample disables version filtering for
    /// the rest of the process.
    async fn resolve_target_version(&mut self) -> Result<(), RoundError> {
        if self.target_resolved {
            return Ok(());
        }
        self.target_resolved = true;

        let configured = self.config.crawl.target_version.clone();
        if configured != "auto" {
            // Config validation guarantees this parses
            self.target_version = configured.parse().ok();
            tracing::info!(
                "{}: targeting configured patch {}",
                self.region.platform,
                configured
            );
            return Ok(());
        }

        let players = {
            let storage = self.storage.lock().unwrap();
            storage.list_players(&self.region.platform)?
        };

        let mut sampled = Vec::new();
        for player in players.iter().take(SAMPLE_PLAYERS) {
            if self.stopped() {
                return Ok(());
            }

            let ids = self
                .client
                .match_ids(&player.puuid, 0, 1, None, None, self.queue_filter())
                .await?;
            let Some(id) = ids.first() else { continue };

            let Some(fetched) = self.client.match_detail(id).await? else {
                continue;
            };
            if let Some(version) = fetched.detail.version() {
                sampled.push(version);
            }
        }

        self.target_version = select_target_version(&sampled);
        match self.target_version {
            Some(version) => tracing::info!(
                "{}: auto-detected target patch {} from {} samples",
                self.region.platform,
                version,
                sampled.len()
            ),
            None => tracing::warn!(
                "{}: no patch detected from samples, version filtering disabled",
                self.region.platform
            ),
        }
        Ok(())
    }

    /// Locates the earliest timestamp of the target patch (best effort,
    /// once per process)
    ///
    /// Tries stored matches first, then walks one player's recent
    /// history newest to oldest. Without a boundary the crawl still
    /// filters correctly by version string, just less efficiently.
    async fn discover_boundary(&mut self) -> Result<(), RoundError> {
        if self.boundary_searched {
            return Ok(());
        }
        self.boundary_searched = true;

        let Some(target) = self.target_version else {
            return Ok(());
        };

        let stored_min = {
            let storage = self.storage.lock().unwrap();
            storage.min_match_timestamp(&target)?
        };
        if let Some(ts) = stored_min {
            if ts >= EARLIEST_VALID_TIMESTAMP {
                self.boundary_ts = Some(ts);
                tracing::info!(
                    "{}: patch {} boundary {} taken from stored matches",
                    self.region.platform,
                    target,
                    ts
                );
                return Ok(());
            }
        }

        let players = {
            let storage = self.storage.lock().unwrap();
            storage.list_players(&self.region.platform)?
        };
        let Some(player) = players.first() else {
            return Ok(());
        };
        let puuid = player.puuid.clone();

        let ids = self
            .client
            .match_ids(&puuid, 0, BOUNDARY_SAMPLE, None, None, self.queue_filter())
            .await?;

        let mut history = Vec::new();
        for id in &ids {
            if self.stopped() {
                return Ok(());
            }
            let Some(fetched) = self.client.match_detail(id).await? else {
                continue;
            };
            if let Some(version) = fetched.detail.version() {
                history.push((version, fetched.detail.game_creation_secs()));
            }
        }

        self.boundary_ts = boundary_from_history(&history, &target);
        match self.boundary_ts {
            Some(ts) => tracing::info!(
                "{}: patch {} boundary {} found in sampled history",
                self.region.platform,
                target,
                ts
            ),
            None => tracing::info!(
                "{}: no boundary found for patch {}, filtering by version only",
                self.region.platform,
                target
            ),
        }
        Ok(())
    }

    /// Scrapes one page of one player's match history
    async fn scrape_player(&mut self, player: &PlayerRecord) -> Result<(), RoundError> {
        let page_size = self.config.crawl.ids_page_size;
        let ids = self
            .client
            .match_ids(
                &player.puuid,
                player.match_offset,
                page_size,
                self.boundary_ts,
                None,
                self.queue_filter(),
            )
            .await?;
        if ids.is_empty() {
            return Ok(());
        }

        let mut stored = 0usize;
        let mut off_patch = 0usize;
        for id in &ids {
            if self.stopped() {
                // Exit without advancing the offset; the whole page is
                // requested again next run.
                return Ok(());
            }

            let known = {
                let storage = self.storage.lock().unwrap();
                storage.match_exists(id)?
            };
            if known {
                continue;
            }

            let Some(fetched) = self.client.match_detail(id).await? else {
                continue;
            };

            if !is_valid_match(&fetched.detail, &self.config.crawl) {
                continue;
            }

            let Some(version) = fetched.detail.version() else {
                continue;
            };

            if let Some(target) = self.target_version {
                if version != target {
                    off_patch += 1;
                    continue;
                }
            }

            let inserted = {
                let mut storage = self.storage.lock().unwrap();
                storage.insert_match(id, &version, fetched.detail.game_creation_secs(), &fetched.raw)?
            };
            if inserted {
                stored += 1;
            }

            if self.latest_seen.map_or(true, |seen| version > seen) {
                self.latest_seen = Some(version);
            }
        }

        // Advance by ids returned, not ids accepted, so filtered-out
        // matches are never requested again.
        let new_offset = player.match_offset + ids.len() as u64;
        {
            let mut storage = self.storage.lock().unwrap();
            storage.update_player_offset(&player.puuid, &player.platform, new_offset)?;
        }

        tracing::debug!(
            "{}: player page of {} ids, {} stored, {} off-patch, offset now {}",
            self.region.platform,
            ids.len(),
            stored,
            off_patch,
            new_offset
        );
        Ok(())
    }

    /// Server-side queue filter for id listings, only when exactly one
    /// queue is allowed (the validation filter still applies either way)
    fn queue_filter(&self) -> Option<i64> {
        match self.config.crawl.queue_ids.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Sleeps, returning true when the stop signal fired instead
    async fn idle(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.stop.wait_for(|stopped| *stopped) => true,
        }
    }
}

/// Walks a newest-to-oldest match history for the boundary timestamp
///
/// Tracks the oldest seen timestamp belonging to the target patch and
/// stops at the first match from a numerically older patch. Timestamps
/// below the release-date floor are corrupt and never accepted.
fn boundary_from_history(history: &[(GameVersion, i64)], target: &GameVersion) -> Option<i64> {
    let mut boundary = None;
    for (version, timestamp) in history {
        if version == target {
            if *timestamp >= EARLIEST_VALID_TIMESTAMP {
                boundary = Some(*timestamp);
            }
        } else if version < target {
            break;
        }
    }
    boundary
}

/// Validation filter applied before persisting a match
///
/// The queue must be in the allow-list and the duration must clear the
/// configured minimum (filters remakes and early surrenders).
fn is_valid_match(detail: &MatchDetail, crawl: &CrawlConfig) -> bool {
    crawl.queue_ids.contains(&detail.info.queue_id)
        && detail.info.game_duration >= crawl.min_duration_secs
}
