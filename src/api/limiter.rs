//! Dual sliding-window rate limiter
//!
//! The remote API enforces two quotas at once: a short burst window
//! (default 20 requests / 1s) and a longer sustained window (default
//! 100 requests / 120s). Before every call the limiter prunes its request
//! history to the sustained window, sleeps until both windows have room,
//! then records the new request. The history is private to one client
//! instance, so one worker per region keeps each region's quota honest
//! without cross-worker locking.
//!
//! Uses `tokio::time::Instant` throughout so the paused test clock drives
//! the windows.

use crate::config::RateLimitSettings;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Safety margin added to every computed wait so a request never lands
/// exactly on a window edge
const WAIT_MARGIN: Duration = Duration::from_millis(50);

/// Sliding-window request history enforcing both quota windows
#[derive(Debug)]
pub struct RequestWindow {
    history: VecDeque<Instant>,
    burst_limit: usize,
    burst_window: Duration,
    sustained_limit: usize,
    sustained_window: Duration,
}

impl RequestWindow {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            history: VecDeque::with_capacity(settings.sustained_limit),
            burst_limit: settings.burst_limit,
            burst_window: Duration::from_secs(settings.burst_window_secs),
            sustained_limit: settings.sustained_limit,
            sustained_window: Duration::from_secs(settings.sustained_window_secs),
        }
    }

    /// Waits until a request slot is available in both windows, then
    /// records the request
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            self.prune(now);

            match self.required_wait(now) {
                Some(wait) => {
                    tracing::trace!("Rate limit saturated, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
                None => break,
            }
        }

        self.history.push_back(Instant::now());
    }

    /// Drops history entries that have slid out of the sustained window
    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.history.front() {
            if now.duration_since(*oldest) >= self.sustained_window {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Computes the wait before the next request fits both windows
    ///
    /// Assumes the history has already been pruned to the sustained
    /// window. Returns None when a request can be made now.
    fn required_wait(&self, now: Instant) -> Option<Duration> {
        if self.history.len() >= self.sustained_limit {
            // The entry that must slide out before the count drops below
            // the limit
            let blocking = self.history[self.history.len() - self.sustained_limit];
            let release = blocking + self.sustained_window + WAIT_MARGIN;
            return Some(release.saturating_duration_since(now));
        }

        let in_burst = self
            .history
            .iter()
            .rev()
            .take_while(|t| now.duration_since(**t) < self.burst_window)
            .count();

        if in_burst >= self.burst_limit {
            let blocking = self.history[self.history.len() - self.burst_limit];
            let release = blocking + self.burst_window + WAIT_MARGIN;
            return Some(release.saturating_duration_since(now));
        }

        None
    }

    /// Number of requests currently recorded in the sustained window
    pub fn sustained_count(&self) -> usize {
        self.history.len()
    }
}
