//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the remote API and drive
//! full scrape rounds end-to-end: roster bootstrap, boundary discovery,
//! match filtering, offset bookkeeping, and the credential breaker.

use rift_harvest::api::ApiClient;
use rift_harvest::config::{
    ApiConfig, Config, CrawlConfig, OutputConfig, RateLimitSettings,
};
use rift_harvest::crawler::RegionWorker;
use rift_harvest::credential::CredentialHealth;
use rift_harvest::region::Region;
use rift_harvest::storage::{SqliteStorage, Storage};
use rift_harvest::GameVersion;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing both API hosts at the mock server
fn create_test_config(base_url: &str, target_version: &str, db_path: &str) -> Config {
    Config {
        api: ApiConfig {
            key: "RGAPI-test-key".to_string(),
            request_timeout_secs: 5,
            retry_attempts: 3,
            retry_after_fallback_secs: 1,
            // Generous limits so tests never sleep on the limiter
            rate_limit: RateLimitSettings {
                burst_limit: 1000,
                burst_window_secs: 1,
                sustained_limit: 5000,
                sustained_window_secs: 120,
            },
        },
        crawl: CrawlConfig {
            tier: "DIAMOND".to_string(),
            divisions: vec!["I".to_string()],
            target_version: target_version.to_string(),
            queue_ids: vec![420],
            min_duration_secs: 300,
            ids_page_size: 10,
            round_delay_secs: 0,
            pause_delay_secs: 0,
            error_delay_secs: 0,
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        regions: vec![create_test_region(base_url)],
    }
}

fn create_test_region(base_url: &str) -> Region {
    Region {
        platform: "na1".to_string(),
        cluster: "americas".to_string(),
        name: "North America".to_string(),
        platform_base_url: Some(base_url.to_string()),
        cluster_base_url: Some(base_url.to_string()),
    }
}

fn entry_json(puuid: &str) -> serde_json::Value {
    json!({
        "puuid": puuid,
        "leagueId": "league-uuid",
        "queueType": "RANKED_SOLO_5x5",
        "tier": "DIAMOND",
        "rank": "I",
        "leaguePoints": 50,
        "wins": 100,
        "losses": 90
    })
}

fn match_json(
    match_id: &str,
    version: &str,
    creation_ms: i64,
    duration: i64,
    queue_id: i64,
) -> serde_json::Value {
    json!({
        "metadata": {
            "matchId": match_id,
            "participants": ["p1", "p2"]
        },
        "info": {
            "gameCreation": creation_ms,
            "gameDuration": duration,
            "gameVersion": version,
            "queueId": queue_id,
            "participants": []
        }
    })
}

/// Builds a worker wired to the mock server
///
/// The stop sender is returned too: dropping it closes the channel and
/// workers read a closed channel as a shutdown request.
fn create_worker(
    config: Config,
    db_path: &std::path::Path,
) -> (
    RegionWorker<SqliteStorage>,
    Arc<Mutex<SqliteStorage>>,
    watch::Sender<bool>,
) {
    let config = Arc::new(config);
    let storage = Arc::new(Mutex::new(SqliteStorage::new(db_path).unwrap()));
    let credential = Arc::new(CredentialHealth::new());
    let (stop_tx, stop_rx) = watch::channel(false);

    let region = config.regions[0].clone();
    let client = ApiClient::new(&config, region.clone(), credential.clone(), stop_rx.clone())
        .expect("failed to build client");
    let worker = RegionWorker::new(
        config,
        region,
        client,
        storage.clone(),
        credential,
        stop_rx,
    );
    (worker, storage, stop_tx)
}

const ENTRIES_PATH: &str = "/lol/league/v4/entries/RANKED_SOLO_5x5/DIAMOND/I";
const ENTRIES_PATH_II: &str = "/lol/league/v4/entries/RANKED_SOLO_5x5/DIAMOND/II";
const IDS_PATH: &str = "/lol/match/v5/matches/by-puuid/p1/ids";

// Creation times comfortably past the release-date floor
const T_OLD_MS: i64 = 1_729_000_000_000;
const T_NEW_MS: i64 = 1_730_000_000_000;

#[tokio::test]
async fn test_bootstrap_discovers_full_roster() {
    let mock_server = MockServer::start().await;

    // Division I: one page of three entries, then an empty page
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            entry_json("p1"),
            entry_json("p2"),
            entry_json("p3"),
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Division II: two entries, then empty
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH_II))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            entry_json("p4"),
            entry_json("p5"),
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH_II))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Every player has an empty match history
    for puuid in ["p1", "p2", "p3", "p4", "p5"] {
        Mock::given(method("GET"))
            .and(path(format!("/lol/match/v5/matches/by-puuid/{}/ids", puuid)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let mut config = create_test_config(&mock_server.uri(), "14.24", db_path.to_str().unwrap());
    config.crawl.divisions = vec!["I".to_string(), "II".to_string()];

    let (mut worker, storage, _stop) = create_worker(config, &db_path);
    worker.run_once().await.expect("round should succeed");

    let storage = storage.lock().unwrap();
    let players = storage.list_players("na1").unwrap();
    assert_eq!(players.len(), 5);
    // Division order, then page order within the division
    let puuids: Vec<&str> = players.iter().map(|p| p.puuid.as_str()).collect();
    assert_eq!(puuids, vec!["p1", "p2", "p3", "p4", "p5"]);
    for player in &players {
        assert_eq!(player.match_offset, 0);
    }

    // The round still refreshes the aggregate counter
    let totals = storage.list_region_totals().unwrap();
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].platform, "na1");
    assert_eq!(totals[0].total_matches, 0);
}

#[tokio::test]
async fn test_round_filters_matches_and_advances_offset() {
    let mock_server = MockServer::start().await;

    // Roster: a single player
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([entry_json("p1")])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Boundary discovery walks the 20 most recent ids
    Mock::given(method("GET"))
        .and(path(IDS_PATH))
        .and(query_param("start", "0"))
        .and(query_param("count", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["NA1_1", "NA1_2"])))
        .mount(&mock_server)
        .await;

    // First scrape page: a keeper, an off-patch match, a wrong-queue match
    Mock::given(method("GET"))
        .and(path(IDS_PATH))
        .and(query_param("start", "0"))
        .and(query_param("count", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["NA1_1", "NA1_2", "NA1_3"])),
        )
        .mount(&mock_server)
        .await;

    // Second scrape page: a duplicate id, which must be skipped without a
    // detail fetch but still advance the offset
    Mock::given(method("GET"))
        .and(path(IDS_PATH))
        .and(query_param("start", "3"))
        .and(query_param("count", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["NA1_1"])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(IDS_PATH))
        .and(query_param("start", "4"))
        .and(query_param("count", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/NA1_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_json(
            "NA1_1",
            "14.24.638.2387",
            T_NEW_MS,
            1800,
            420,
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/NA1_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_json(
            "NA1_2",
            "14.23.612.1034",
            T_OLD_MS,
            1750,
            420,
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/NA1_3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_json(
            "NA1_3",
            "14.24.638.2387",
            T_NEW_MS,
            1800,
            440,
        )))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let config = create_test_config(&mock_server.uri(), "14.24", db_path.to_str().unwrap());

    let (mut worker, storage, _stop) = create_worker(config, &db_path);
    worker.run_once().await.expect("first round should succeed");

    let target = GameVersion::new(14, 24);
    {
        let storage = storage.lock().unwrap();
        // Only NA1_1 survives the filters
        assert!(storage.match_exists("NA1_1").unwrap());
        assert!(!storage.match_exists("NA1_2").unwrap());
        assert!(!storage.match_exists("NA1_3").unwrap());
        assert_eq!(storage.count_matches(Some(&target)).unwrap(), 1);

        // The offset advanced by ids returned, not ids accepted
        let players = storage.list_players("na1").unwrap();
        assert_eq!(players[0].match_offset, 3);

        let totals = storage.list_region_totals().unwrap();
        assert_eq!(totals[0].total_matches, 1);
    }

    // Second round: the duplicate page advances the offset but stores
    // nothing new
    worker.run_once().await.expect("second round should succeed");
    {
        let storage = storage.lock().unwrap();
        assert_eq!(storage.count_matches(Some(&target)).unwrap(), 1);
        let players = storage.list_players("na1").unwrap();
        assert_eq!(players[0].match_offset, 4);
    }
}

#[tokio::test]
async fn test_missing_auth_opens_breaker_and_fails_fast() {
    let mock_server = MockServer::start().await;

    // Exactly one request may reach the server; the second call must be
    // rejected locally by the open breaker
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/lol/status/v4/platform-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "NA1"})))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let config = create_test_config(&mock_server.uri(), "14.24", db_path.to_str().unwrap());

    let credential = Arc::new(CredentialHealth::new());
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut client = ApiClient::new(
        &config,
        config.regions[0].clone(),
        credential.clone(),
        stop_rx,
    )
    .unwrap();

    let err = client.league_entries("DIAMOND", "I", 1).await.unwrap_err();
    assert_eq!(err, rift_harvest::ApiError::CredentialInvalid);
    assert!(!credential.is_valid());

    // Breaker is open: no network call happens (the mock's expect(1)
    // verifies this on drop)
    let err = client.league_entries("DIAMOND", "I", 1).await.unwrap_err();
    assert_eq!(err, rift_harvest::ApiError::CredentialInvalid);

    // The probe bypasses the breaker and closes it on success
    assert!(client.probe().await);
    assert!(credential.is_valid());
}

#[tokio::test]
async fn test_ambiguous_auth_does_not_open_breaker() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let config = create_test_config(&mock_server.uri(), "14.24", db_path.to_str().unwrap());

    let credential = Arc::new(CredentialHealth::new());
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut client = ApiClient::new(
        &config,
        config.regions[0].clone(),
        credential.clone(),
        stop_rx,
    )
    .unwrap();

    // 403 degrades to an empty page and leaves the credential alone
    let entries = client.league_entries("DIAMOND", "I", 1).await.unwrap();
    assert!(entries.is_empty());
    assert!(credential.is_valid());
}

#[tokio::test]
async fn test_rate_limited_request_waits_and_retries() {
    let mock_server = MockServer::start().await;

    // First response throttles with an explicit Retry-After, then the
    // same request succeeds
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([entry_json("p1")])))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let config = create_test_config(&mock_server.uri(), "14.24", db_path.to_str().unwrap());

    let credential = Arc::new(CredentialHealth::new());
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut client = ApiClient::new(
        &config,
        config.regions[0].clone(),
        credential.clone(),
        stop_rx,
    )
    .unwrap();

    let started = std::time::Instant::now();
    let entries = client.league_entries("DIAMOND", "I", 1).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(
        started.elapsed() >= std::time::Duration::from_secs(1),
        "client should have honored Retry-After"
    );
    assert!(credential.is_valid());
}

#[tokio::test]
async fn test_transient_errors_exhaust_retry_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let mut config = create_test_config(&mock_server.uri(), "14.24", db_path.to_str().unwrap());
    config.api.retry_attempts = 2;

    let credential = Arc::new(CredentialHealth::new());
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut client = ApiClient::new(
        &config,
        config.regions[0].clone(),
        credential.clone(),
        stop_rx,
    )
    .unwrap();

    // Budget exhausted: degrades to empty rather than failing the round
    let entries = client.league_entries("DIAMOND", "I", 1).await.unwrap();
    assert!(entries.is_empty());
    assert!(credential.is_valid());
}
