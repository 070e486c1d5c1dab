pub mod client_rate_limiter;
pub mod compare;
pub mod config;
pub mod error;
pub mod export;
pub mod handle;
pub mod list_fetcher;
pub mod placeholder;
pub mod proxy_service;
pub mod server;
pub mod session;
pub mod upstream;
pub mod upstream_backoff;

#[cfg(test)]
mod tests;

pub use client_rate_limiter::ClientRateLimiter;
pub use compare::{compare, ComparisonResult};
pub use config::{ProxyConfig, RateLimitConfig, UpstreamConfig};
pub use error::CheckError;
pub use export::{export, export_filename, write_export, ExportDocument};
pub use handle::{normalize_entry, Handle};
pub use list_fetcher::{AggregatedList, ListFetcher};
pub use proxy_service::ProxyService;
pub use server::{router, AppState, ListResponse};
pub use session::{CheckReport, CheckSession, CheckSource, DemoSource, FollowChecker, ProxyClient};
pub use upstream::{ListKind, ListPage, Profile, SocialGraphApi, UpstreamClient};
pub use upstream_backoff::UpstreamBackoff;
