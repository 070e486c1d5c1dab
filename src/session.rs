//! Client side of a check: talk to the proxy, compare, keep the last result

use crate::compare::{compare, ComparisonResult};
use crate::error::CheckError;
use crate::export::ExportDocument;
use crate::handle::{normalize_entry, Handle};
use crate::placeholder::demo_lists;
use crate::server::{ErrorBody, ListResponse};
use crate::upstream::{ListKind, Profile};
use crate::upstream_backoff::parse_retry_after;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a check gets its profile and lists from.
#[async_trait]
pub trait CheckSource: Send + Sync {
    async fn profile(&self, handle: &Handle) -> Result<Profile, CheckError>;

    async fn list(&self, user_id: &str, kind: ListKind) -> Result<ListResponse, CheckError>;
}

/// HTTP client for the proxy's `/api` surface.
#[derive(Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<Response, CheckError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_default();
        warn!("Proxy returned {} for {}: {}", status, path, message);

        Err(match status {
            StatusCode::BAD_REQUEST => CheckError::InvalidInput(message),
            StatusCode::FORBIDDEN => CheckError::PrivateProfile,
            StatusCode::NOT_FOUND => CheckError::NotFound,
            StatusCode::TOO_MANY_REQUESTS => CheckError::Throttled { retry_after },
            other => CheckError::UpstreamError(other.as_u16()),
        })
    }
}

#[async_trait]
impl CheckSource for ProxyClient {
    async fn profile(&self, handle: &Handle) -> Result<Profile, CheckError> {
        let response = self.get(&format!("/api/profile/{handle}")).await?;
        Ok(response.json().await?)
    }

    async fn list(&self, user_id: &str, kind: ListKind) -> Result<ListResponse, CheckError> {
        let response = self.get(&format!("/api/{kind}/{user_id}")).await?;
        Ok(response.json().await?)
    }
}

/// Offline source serving made-up lists.
pub struct DemoSource {
    followers: Vec<String>,
    following: Vec<String>,
}

impl DemoSource {
    pub fn new<R: rand::Rng>(
        rng: &mut R,
        followers: usize,
        following: usize,
        mutual: usize,
    ) -> Self {
        let (followers, following) = demo_lists(rng, followers, following, mutual);
        Self {
            followers,
            following,
        }
    }
}

#[async_trait]
impl CheckSource for DemoSource {
    async fn profile(&self, handle: &Handle) -> Result<Profile, CheckError> {
        Ok(Profile {
            id: "0".to_string(),
            username: handle.to_string(),
            full_name: String::new(),
            is_private: false,
            follower_count: Some(self.followers.len() as u64),
            following_count: Some(self.following.len() as u64),
        })
    }

    async fn list(&self, _user_id: &str, kind: ListKind) -> Result<ListResponse, CheckError> {
        let users = match kind {
            ListKind::Followers => self.followers.clone(),
            ListKind::Following => self.following.clone(),
        };
        Ok(ListResponse {
            total: users.len(),
            users,
            partial: false,
        })
    }
}

/// Progress reported while a check runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStage {
    LookingUpProfile(String),
    FetchingLists {
        follower_count: Option<u64>,
        following_count: Option<u64>,
    },
    Comparing,
}

impl fmt::Display for CheckStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |c: &Option<u64>| c.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
        match self {
            CheckStage::LookingUpProfile(handle) => write!(f, "Looking up @{handle}"),
            CheckStage::FetchingLists {
                follower_count,
                following_count,
            } => write!(
                f,
                "Fetching lists (followers: {}, following: {})",
                count(follower_count),
                count(following_count)
            ),
            CheckStage::Comparing => write!(f, "Comparing lists"),
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub subject: String,
    pub profile: Profile,
    /// Normalized followers in upstream order
    pub followers: Vec<String>,
    /// Normalized following in upstream order
    pub following: Vec<String>,
    /// `only_in_a` is followers-only, `only_in_b` following-only
    pub comparison: ComparisonResult,
    /// At least one list was cut short by an upstream failure
    pub partial: bool,
}

impl CheckReport {
    pub fn to_export(&self) -> ExportDocument {
        ExportDocument::new(
            &self.subject,
            &self.followers,
            &self.following,
            &self.comparison,
        )
    }
}

pub struct FollowChecker<S> {
    source: S,
}

impl<S: CheckSource> FollowChecker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn check(&self, raw_handle: &str) -> Result<CheckReport, CheckError> {
        self.check_with_progress(raw_handle, |_| {}).await
    }

    /// Look up the profile, refuse private ones, fetch both lists
    /// concurrently and compare them.
    pub async fn check_with_progress<F>(
        &self,
        raw_handle: &str,
        on_stage: F,
    ) -> Result<CheckReport, CheckError>
    where
        F: Fn(CheckStage),
    {
        let handle = Handle::parse(raw_handle)?;

        on_stage(CheckStage::LookingUpProfile(handle.to_string()));
        let profile = self.source.profile(&handle).await?;

        if profile.is_private {
            info!("@{} is private, stopping", handle);
            return Err(CheckError::PrivateProfile);
        }

        on_stage(CheckStage::FetchingLists {
            follower_count: profile.follower_count,
            following_count: profile.following_count,
        });
        let (follower_list, following_list) = tokio::try_join!(
            self.source.list(&profile.id, ListKind::Followers),
            self.source.list(&profile.id, ListKind::Following),
        )?;
        let partial = follower_list.partial || following_list.partial;
        if partial {
            warn!("Lists for @{} are incomplete", handle);
        }

        on_stage(CheckStage::Comparing);
        let followers: Vec<String> = follower_list
            .users
            .iter()
            .map(|u| normalize_entry(u))
            .collect();
        let following: Vec<String> = following_list
            .users
            .iter()
            .map(|u| normalize_entry(u))
            .collect();
        let comparison = compare(&followers, &following);

        info!(
            "@{}: {} mutual, {} followers only, {} following only",
            handle,
            comparison.mutual.len(),
            comparison.only_in_a.len(),
            comparison.only_in_b.len()
        );

        Ok(CheckReport {
            subject: handle.into_inner(),
            profile,
            followers,
            following,
            comparison,
            partial,
        })
    }
}

/// Holds the most recent report for export; a new check replaces it.
#[derive(Debug, Default)]
pub struct CheckSession {
    current: Option<CheckReport>,
}

impl CheckSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, report: CheckReport) {
        self.current = Some(report);
    }

    pub fn current(&self) -> Option<&CheckReport> {
        self.current.as_ref()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Export document for the held report, if any.
    pub fn export(&self) -> Option<ExportDocument> {
        self.current.as_ref().map(CheckReport::to_export)
    }
}
