//! Proxy configuration loaded from the environment

use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://meowrhino.github.io",
    "http://localhost:3000",
    "http://localhost:5500",
    "http://127.0.0.1:5500",
];

/// Upstream API settings
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the social-graph API, without trailing slash
    pub base_url: String,
    /// App id header the upstream requires
    pub app_id: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Items requested per list page
    pub page_size: usize,
    /// Hard cap on pages fetched per list
    pub max_pages: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.instagram.com".to_string(),
            app_id: "936619743392459".to_string(),
            timeout: Duration::from_secs(15),
            page_size: 50,
            max_pages: 10,
        }
    }
}

/// Per-client request limits
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_addr: SocketAddr,
    pub service_name: String,
    pub allowed_origins: Vec<String>,
    pub upstream: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            service_name: "follow-checker-proxy".to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            upstream: UpstreamConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Build the config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port: u16 = env_or("PORT", 3001);
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{port}"));
        let bind_addr = bind_addr.parse().unwrap_or_else(|e| {
            warn!("Invalid BIND_ADDR {}: {}, using default", bind_addr, e);
            SocketAddr::from(([0, 0, 0, 0], port))
        });

        let service_name = std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or(defaults.allowed_origins);

        let upstream = UpstreamConfig {
            base_url: std::env::var("UPSTREAM_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.upstream.base_url),
            app_id: std::env::var("UPSTREAM_APP_ID").unwrap_or(defaults.upstream.app_id),
            timeout: Duration::from_secs(env_or::<u64>("UPSTREAM_TIMEOUT_SECS", 15)),
            page_size: env_or("PAGE_SIZE", defaults.upstream.page_size),
            max_pages: env_or("MAX_PAGES", defaults.upstream.max_pages).max(1),
        };

        let rate_limit = RateLimitConfig {
            window: Duration::from_secs(env_or::<u64>("RATE_LIMIT_WINDOW_SECS", 60)),
            max_requests: env_or("RATE_LIMIT_MAX", defaults.rate_limit.max_requests),
            sweep_interval: Duration::from_secs(env_or::<u64>("RATE_LIMIT_SWEEP_SECS", 60).max(1)),
        };

        Self {
            bind_addr,
            service_name,
            allowed_origins,
            upstream,
            rate_limit,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={}", key, value);
            default
        }),
        Err(_) => default,
    }
}

/// Split a comma separated origin list, dropping blanks.
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.upstream.page_size, 50);
        assert_eq!(config.upstream.max_pages, 10);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.allowed_origins.len(), 4);
    }

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins(" https://a.example/ ,, http://localhost:5500");
        assert_eq!(origins, vec!["https://a.example", "http://localhost:5500"]);
    }
}
