//! Per-client fixed-window request limiter
//!
//! Each client key (the caller's network address) gets one window. The
//! first request opens it, the next `max_requests - 1` are admitted, and
//! everything after is rejected until the window is older than `window`.

use crate::config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

/// Owns every client's window. Shared by the request handlers and the sweeper.
pub struct ClientRateLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window, config.max_requests)
    }

    /// Admit or reject one request from `client_key` now.
    pub fn admit(&self, client_key: &str) -> bool {
        self.admit_at(client_key, Instant::now())
    }

    /// Admit or reject one request from `client_key` at `now`.
    pub fn admit_at(&self, client_key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();

        match windows.get_mut(client_key) {
            Some(entry) if now.saturating_duration_since(entry.window_start) <= self.window => {
                if entry.count >= self.max_requests {
                    debug!(
                        "Rejecting {}: {} requests in current window",
                        client_key, entry.count
                    );
                    return false;
                }
                entry.count += 1;
                true
            }
            _ => {
                if self.max_requests == 0 {
                    return false;
                }
                windows.insert(
                    client_key.to_string(),
                    RateWindow {
                        window_start: now,
                        count: 1,
                    },
                );
                true
            }
        }
    }

    /// Drop windows older than the window length. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, entry| now.saturating_duration_since(entry.window_start) <= self.window);
        before - windows.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Number of clients currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }

    /// Periodically purge stale windows until `cancellation_token` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        every: Duration,
        task_tracker: &TaskTracker,
        cancellation_token: CancellationToken,
    ) {
        let limiter = Arc::clone(self);
        task_tracker.spawn(async move {
            let mut ticker = interval(every);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        info!("Rate limit sweeper cancelled, exiting");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            debug!(
                                "Swept {} stale rate windows, {} remaining",
                                removed,
                                limiter.tracked_clients()
                            );
                        }
                    }
                }
            }
        });
    }
}
