//! Rate-limited front for the upstream: profile lookup and list retrieval

use crate::client_rate_limiter::ClientRateLimiter;
use crate::error::CheckError;
use crate::handle::Handle;
use crate::list_fetcher::{AggregatedList, ListFetcher};
use crate::upstream::{ListKind, Profile, SocialGraphApi};
use std::sync::Arc;
use tracing::{info, warn};

/// Longest upstream user id accepted in a request path.
const MAX_USER_ID_LEN: usize = 64;

pub struct ProxyService {
    limiter: Arc<ClientRateLimiter>,
    api: Arc<dyn SocialGraphApi>,
    fetcher: ListFetcher,
}

impl ProxyService {
    pub fn new(
        limiter: Arc<ClientRateLimiter>,
        api: Arc<dyn SocialGraphApi>,
        page_size: usize,
        max_pages: usize,
    ) -> Self {
        let fetcher = ListFetcher::new(api.clone(), page_size, max_pages);
        Self {
            limiter,
            api,
            fetcher,
        }
    }

    pub fn limiter(&self) -> &Arc<ClientRateLimiter> {
        &self.limiter
    }

    fn gate(&self, client_key: &str) -> Result<(), CheckError> {
        if self.limiter.admit(client_key) {
            Ok(())
        } else {
            info!("Throttling client {}", client_key);
            Err(CheckError::throttled())
        }
    }

    /// Resolve a typed handle to its profile. Private profiles are returned
    /// as well; the caller decides what to do with them.
    pub async fn get_profile(&self, client_key: &str, raw_handle: &str) -> Result<Profile, CheckError> {
        self.gate(client_key)?;

        let handle = Handle::parse(raw_handle)?;
        info!("Profile lookup for @{} from {}", handle, client_key);

        self.api.profile(&handle).await.inspect_err(|e| {
            warn!("Profile lookup for @{} failed: {}", handle, e);
        })
    }

    pub async fn get_followers(
        &self,
        client_key: &str,
        user_id: &str,
    ) -> Result<AggregatedList, CheckError> {
        self.get_list(client_key, user_id, ListKind::Followers).await
    }

    pub async fn get_following(
        &self,
        client_key: &str,
        user_id: &str,
    ) -> Result<AggregatedList, CheckError> {
        self.get_list(client_key, user_id, ListKind::Following).await
    }

    async fn get_list(
        &self,
        client_key: &str,
        user_id: &str,
        kind: ListKind,
    ) -> Result<AggregatedList, CheckError> {
        self.gate(client_key)?;
        validate_user_id(user_id)?;

        info!("{} request for {} from {}", kind, user_id, client_key);
        self.fetcher.fetch_all(user_id, kind).await
    }
}

/// Upstream ids are numeric strings; anything else would end up in the
/// upstream URL path.
fn validate_user_id(user_id: &str) -> Result<(), CheckError> {
    if user_id.is_empty() || user_id.len() > MAX_USER_ID_LEN {
        return Err(CheckError::InvalidInput(format!(
            "user id must be 1 to {MAX_USER_ID_LEN} characters"
        )));
    }
    if !user_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CheckError::InvalidInput(
            "user id contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
