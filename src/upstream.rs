//! Client for the third-party social-graph API
//!
//! Two calls are needed: a profile lookup by handle, and one page of a
//! followers/following list. Everything else (pagination, rate limiting of
//! our own callers) is layered on top.

use crate::config::UpstreamConfig;
use crate::error::CheckError;
use crate::handle::Handle;
use crate::upstream_backoff::{parse_retry_after, UpstreamBackoff};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Which side of the social graph to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Followers,
    Following,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Followers => "followers",
            ListKind::Following => "following",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public profile data, as returned by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub following_count: Option<u64>,
}

/// One upstream list response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListPage {
    pub items: Vec<String>,
    pub next_cursor: Option<String>,
}

/// The operations the proxy needs from the upstream.
#[async_trait]
pub trait SocialGraphApi: Send + Sync {
    async fn profile(&self, handle: &Handle) -> Result<Profile, CheckError>;

    async fn list_page(
        &self,
        user_id: &str,
        kind: ListKind,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage, CheckError>;
}

#[derive(Deserialize)]
struct WebProfileResponse {
    data: Option<WebProfileData>,
}

#[derive(Deserialize)]
struct WebProfileData {
    user: Option<WebProfileUser>,
}

#[derive(Deserialize)]
struct WebProfileUser {
    id: Value,
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    is_private: bool,
    edge_followed_by: Option<EdgeCount>,
    edge_follow: Option<EdgeCount>,
}

#[derive(Deserialize)]
struct EdgeCount {
    count: u64,
}

#[derive(Deserialize)]
struct FriendshipsResponse {
    #[serde(default)]
    users: Vec<FriendshipUser>,
    #[serde(default)]
    next_max_id: Option<Value>,
}

#[derive(Deserialize)]
struct FriendshipUser {
    username: String,
}

/// Ids and cursors come back as either strings or numbers.
fn value_to_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// HTTP implementation of [`SocialGraphApi`].
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
    backoff: Arc<UpstreamBackoff>,
    host: String,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_backoff(config, Arc::new(UpstreamBackoff::new()))
    }

    pub fn with_backoff(
        config: UpstreamConfig,
        backoff: Arc<UpstreamBackoff>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let host = UpstreamBackoff::host_of(&config.base_url)
            .ok_or("Invalid upstream base URL: no host")?;

        let mut headers = HeaderMap::new();
        headers.insert("X-IG-App-ID", HeaderValue::from_str(&config.app_id)?);
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config,
            backoff,
            host,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, CheckError> {
        if let Err(wait_time) = self.backoff.check(&self.host).await {
            return Err(CheckError::Throttled {
                retry_after: Some(wait_time),
            });
        }

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!("Upstream request to {} failed: {}", url, e);
                CheckError::NetworkFailure(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        debug!("Upstream {} returned {}", url, status);
        match status {
            StatusCode::NOT_FOUND => Err(CheckError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(
                    response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                let period = self.backoff.record_throttle(&self.host, retry_after).await;
                Err(CheckError::Throttled {
                    retry_after: Some(period),
                })
            }
            other => Err(CheckError::UpstreamError(other.as_u16())),
        }
    }
}

#[async_trait]
impl SocialGraphApi for UpstreamClient {
    async fn profile(&self, handle: &Handle) -> Result<Profile, CheckError> {
        let url = format!(
            "{}/api/v1/users/web_profile_info/",
            self.config.base_url
        );
        let response = self.get(&url, &[("username", handle.as_str())]).await?;
        let body: WebProfileResponse = response.json().await?;

        let Some(user) = body.data.and_then(|d| d.user) else {
            return Err(CheckError::NotFound);
        };

        let id = value_to_token(&user.id)
            .ok_or_else(|| CheckError::Decode("profile has no usable id".to_string()))?;

        Ok(Profile {
            id,
            username: user.username,
            full_name: user.full_name.unwrap_or_default(),
            is_private: user.is_private,
            follower_count: user.edge_followed_by.map(|e| e.count),
            following_count: user.edge_follow.map(|e| e.count),
        })
    }

    async fn list_page(
        &self,
        user_id: &str,
        kind: ListKind,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage, CheckError> {
        let url = format!(
            "{}/api/v1/friendships/{}/{}/",
            self.config.base_url, user_id, kind
        );
        let count = page_size.to_string();
        let mut query = vec![("count", count.as_str())];
        if let Some(cursor) = cursor {
            query.push(("max_id", cursor));
        }

        let response = self.get(&url, &query).await?;
        let body: FriendshipsResponse = response.json().await?;

        Ok(ListPage {
            items: body.users.into_iter().map(|u| u.username).collect(),
            next_cursor: body.next_max_id.as_ref().and_then(value_to_token),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_token() {
        assert_eq!(value_to_token(&json!("QVFE")), Some("QVFE".to_string()));
        assert_eq!(value_to_token(&json!(150)), Some("150".to_string()));
        assert_eq!(value_to_token(&json!("")), None);
        assert_eq!(value_to_token(&Value::Null), None);
    }

    #[test]
    fn test_list_kind_path() {
        assert_eq!(ListKind::Followers.to_string(), "followers");
        assert_eq!(ListKind::Following.as_str(), "following");
    }

    #[test]
    fn test_rejects_base_url_without_host() {
        let config = UpstreamConfig {
            base_url: "not a url".to_string(),
            ..UpstreamConfig::default()
        };
        assert!(UpstreamClient::new(config).is_err());
    }
}
