use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Back-off used when the upstream sends a 429 without `Retry-After`.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(6);

/// Tracks upstream hosts that recently answered 429 so further calls can
/// fail fast instead of burning more of the upstream quota.
pub struct UpstreamBackoff {
    host_limiters: Arc<Mutex<HashMap<String, Arc<DefaultDirectRateLimiter>>>>,
}

impl UpstreamBackoff {
    pub fn new() -> Self {
        Self {
            host_limiters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ok if the host may be called now, otherwise how long to wait.
    ///
    /// A host with no recorded 429 is never limited. Once the back-off for
    /// a host has elapsed the host is forgotten.
    pub async fn check(&self, host: &str) -> Result<(), Duration> {
        let mut limiters = self.host_limiters.lock().await;
        let Some(limiter) = limiters.get(host) else {
            return Ok(());
        };

        match limiter.check() {
            Ok(_) => {
                limiters.remove(host);
                Ok(())
            }
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(Clock::now(&DefaultClock::default()));
                debug!("Upstream {} backing off for {:?}", host, wait_time);
                Err(wait_time)
            }
        }
    }

    /// Record a 429 from `host`, blocking it for `retry_after` (or the default).
    pub async fn record_throttle(&self, host: &str, retry_after: Option<Duration>) -> Duration {
        let period = retry_after
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_BACKOFF);
        let Some(quota) = Quota::with_period(period) else {
            return period;
        };

        let limiter = RateLimiter::direct(quota);
        // Spend the only cell so the host is blocked for a full period
        let _ = limiter.check();

        self.host_limiters
            .lock()
            .await
            .insert(host.to_string(), Arc::new(limiter));

        warn!("Upstream {} throttled us, backing off for {:?}", host, period);
        period
    }

    pub fn host_of(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
    }
}

impl Default for UpstreamBackoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a `Retry-After` header given in seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
