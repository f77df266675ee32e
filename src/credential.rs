//! Credential health tracking
//!
//! All outbound API calls in the process share one credential (the API
//! key). When the remote API rejects it outright, every worker should stop
//! spending rate-limit slots on calls that are known to be doomed. This
//! module holds the process-wide valid/invalid flag: a simple shared
//! circuit breaker with no half-open state. Any successful real call or a
//! positive probe fully closes it again.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Snapshot of the credential state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialStatus {
    pub valid: bool,
    pub invalid_since: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    valid: bool,
    invalid_since: Option<DateTime<Utc>>,
}

/// Process-wide credential breaker shared by all workers
///
/// Both transitions are idempotent: re-marking a state that already holds
/// is a no-op, so the "invalid since" timestamp always reflects the first
/// failure of the current outage, not the latest one.
#[derive(Debug)]
pub struct CredentialHealth {
    inner: Mutex<Inner>,
}

impl CredentialHealth {
    /// Creates a new breaker in the valid (closed) state
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                valid: true,
                invalid_since: None,
            }),
        }
    }

    /// Returns whether the credential is currently believed valid
    pub fn is_valid(&self) -> bool {
        self.inner.lock().unwrap().valid
    }

    /// Opens the breaker after a hard authentication failure
    ///
    /// Only the first transition records the timestamp and logs; repeated
    /// calls while already invalid change nothing.
    pub fn mark_invalid(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.valid {
            inner.valid = false;
            inner.invalid_since = Some(Utc::now());
            tracing::warn!("API credential rejected, pausing all workers");
        }
    }

    /// Closes the breaker after a successful call or probe
    pub fn mark_valid(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.valid {
            inner.valid = true;
            inner.invalid_since = None;
            tracing::info!("API credential valid again, resuming workers");
        }
    }

    /// Returns the current state and the first-failure timestamp, if any
    pub fn status(&self) -> CredentialStatus {
        let inner = self.inner.lock().unwrap();
        CredentialStatus {
            valid: inner.valid,
            invalid_since: inner.invalid_since,
        }
    }
}

impl Default for CredentialHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background re-validation task
///
/// The task ticks on a fixed interval and, only while the breaker is open,
/// runs the supplied probe. A positive probe closes the breaker. While the
/// breaker is closed each tick is a single flag read, so running the task
/// for the whole process lifetime costs nothing.
pub fn spawn_revalidation_task<F, Fut>(
    health: Arc<CredentialHealth>,
    interval: Duration,
    probe: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh process
        // does not probe before any call has failed.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if health.is_valid() {
                continue;
            }

            tracing::debug!("Probing API with invalid credential");
            if probe().await {
                health.mark_valid();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_starts_valid() {
        let health = CredentialHealth::new();
        assert!(health.is_valid());
        assert_eq!(health.status().invalid_since, None);
    }

    #[test]
    fn test_mark_invalid_records_timestamp_once() {
        let health = CredentialHealth::new();

        health.mark_invalid();
        assert!(!health.is_valid());
        let first = health.status().invalid_since;
        assert!(first.is_some());

        // A repeated failure while already invalid keeps the original
        // timestamp.
        health.mark_invalid();
        assert_eq!(health.status().invalid_since, first);
    }

    #[test]
    fn test_mark_valid_clears_timestamp() {
        let health = CredentialHealth::new();
        health.mark_invalid();

        health.mark_valid();
        assert!(health.is_valid());
        assert_eq!(health.status().invalid_since, None);
    }

    #[test]
    fn test_mark_valid_idempotent() {
        let health = CredentialHealth::new();
        health.mark_valid();
        health.mark_valid();
        assert!(health.is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidation_probe_closes_breaker() {
        let health = Arc::new(CredentialHealth::new());
        health.mark_invalid();

        let probes = Arc::new(AtomicUsize::new(0));
        let probes_clone = probes.clone();
        let task = spawn_revalidation_task(health.clone(), Duration::from_secs(60), move || {
            let probes = probes_clone.clone();
            async move {
                probes.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        // Advance past one probe interval
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert!(health.is_valid());
        assert_eq!(probes.load(Ordering::SeqCst), 1);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidation_probe_idle_while_valid() {
        let health = Arc::new(CredentialHealth::new());

        let probes = Arc::new(AtomicUsize::new(0));
        let probes_clone = probes.clone();
        let task = spawn_revalidation_task(health.clone(), Duration::from_secs(60), move || {
            let probes = probes_clone.clone();
            async move {
                probes.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        tokio::time::sleep(Duration::from_secs(300)).await;
        tokio::task::yield_now().await;

        // Breaker never opened, so the probe never ran
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        task.abort();
    }
}
