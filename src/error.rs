use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Every way a follower check can fail.
///
/// A truncated list is not represented here: pagination that stops early
/// after the first page is reported through `AggregatedList::partial`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Empty or over-long handle, rejected before any network call.
    InvalidInput(String),
    NotFound,
    PrivateProfile,
    /// Local rate limit or upstream 429.
    Throttled { retry_after: Option<Duration> },
    /// Upstream answered with a status other than 2xx, 404 or 429.
    UpstreamError(u16),
    /// Transport failure talking to the upstream or the proxy.
    NetworkFailure(String),
    /// Response body could not be decoded.
    Decode(String),
}

impl CheckError {
    pub fn throttled() -> Self {
        CheckError::Throttled { retry_after: None }
    }

    /// Message shown to a person running a check.
    pub fn user_message(&self) -> &'static str {
        match self {
            CheckError::InvalidInput(_) => "Invalid username. Use 1 to 30 characters.",
            CheckError::NotFound => "User not found. Check that the handle is correct.",
            CheckError::PrivateProfile => {
                "This profile is private. Only public profiles can be checked."
            }
            CheckError::Throttled { .. } => "Too many requests. Wait a moment and try again.",
            CheckError::UpstreamError(_) => "Could not fetch the profile data. Try again later.",
            CheckError::NetworkFailure(_) | CheckError::Decode(_) => {
                "Server error while fetching data. Try again."
            }
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            CheckError::NotFound => write!(f, "Profile not found"),
            CheckError::PrivateProfile => write!(f, "Profile is private"),
            CheckError::Throttled { retry_after } => match retry_after {
                Some(duration) => write!(f, "Throttled: retry after {duration:?}"),
                None => write!(f, "Throttled"),
            },
            CheckError::UpstreamError(status) => write!(f, "Upstream error: HTTP {status}"),
            CheckError::NetworkFailure(msg) => write!(f, "Network error: {msg}"),
            CheckError::Decode(msg) => write!(f, "Decode error: {msg}"),
        }
    }
}

impl Error for CheckError {}

impl From<reqwest::Error> for CheckError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CheckError::Decode(e.to_string())
        } else {
            CheckError::NetworkFailure(e.to_string())
        }
    }
}
