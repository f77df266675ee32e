//! Worker pool orchestration
//!
//! Spawns one independent worker task per configured region, plus the
//! credential revalidation task, and wires them all to a shared stop
//! signal driven by Ctrl-C. Workers share nothing but the storage handle
//! and the credential breaker.

use crate::api::ApiClient;
use crate::config::Config;
use crate::credential::{spawn_revalidation_task, CredentialHealth};
use crate::crawler::RegionWorker;
use crate::storage::Storage;
use crate::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// How often the revalidation task polls while the credential is invalid
const REVALIDATION_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the harvest until a shutdown signal arrives
///
/// Blocks until every worker task has exited. Workers stop between units
/// of work, so shutdown is prompt but never interrupts an in-flight
/// database write.
pub async fn run_harvest<S>(config: Config, storage: S) -> Result<()>
where
    S: Storage + Send + 'static,
{
    let config = Arc::new(config);
    let storage = Arc::new(Mutex::new(storage));
    let credential = Arc::new(CredentialHealth::new());
    let (stop_tx, stop_rx) = watch::channel(false);

    let Some(probe_region) = config.regions.first().cloned() else {
        tracing::warn!("No regions configured, nothing to harvest");
        return Ok(());
    };

    // The revalidation probe goes through the first region's platform
    // host; which host answers is irrelevant since the key is global.
    let probe_client = ApiClient::new(&config, probe_region, credential.clone(), stop_rx.clone())?;
    let probe_client = Arc::new(tokio::sync::Mutex::new(probe_client));
    let probe_task = spawn_revalidation_task(credential.clone(), REVALIDATION_INTERVAL, move || {
        let client = probe_client.clone();
        async move { client.lock().await.probe().await }
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received, stopping workers");
                let _ = stop_tx.send(true);
            }
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        }
    });

    let mut handles = Vec::new();
    for region in &config.regions {
        let client = ApiClient::new(&config, region.clone(), credential.clone(), stop_rx.clone())?;
        let mut worker = RegionWorker::new(
            config.clone(),
            region.clone(),
            client,
            storage.clone(),
            credential.clone(),
            stop_rx.clone(),
        );
        let platform = region.platform.clone();
        handles.push((platform, tokio::spawn(async move { worker.run().await })));
    }
    drop(stop_rx);

    for (platform, handle) in handles {
        if let Err(e) = handle.await {
            tracing::error!("Worker task for {} aborted: {}", platform, e);
        }
    }

    probe_task.abort();
    tracing::info!("All workers stopped");
    Ok(())
}
