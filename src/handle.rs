//! Account handle normalization
//!
//! One policy is used everywhere: trim whitespace, drop a leading `@`,
//! lowercase. Typed handles are additionally checked against the handle
//! alphabet (`a-z`, `0-9`, `.`, `_`) and the length limit.

use crate::error::CheckError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_HANDLE_LEN: usize = 30;

/// A validated, normalized account handle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Normalize and validate a handle typed by a user.
    pub fn parse(raw: &str) -> Result<Self, CheckError> {
        let normalized = normalize_entry(raw);

        if normalized.is_empty() {
            return Err(CheckError::InvalidInput("handle is empty".to_string()));
        }

        let len = normalized.chars().count();
        if len > MAX_HANDLE_LEN {
            return Err(CheckError::InvalidInput(format!(
                "handle is {len} characters, max is {MAX_HANDLE_LEN}"
            )));
        }

        if let Some(bad) = normalized.chars().find(|c| !is_handle_char(*c)) {
            return Err(CheckError::InvalidInput(format!(
                "handle contains '{bad}', only letters, digits, '.' and '_' are allowed"
            )));
        }

        Ok(Handle(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_handle_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_'
}

/// Normalize a handle from an upstream list. No length check.
pub fn normalize_entry(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed);
    trimmed.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_at_and_lowercases() {
        let handle = Handle::parse("  @Some.User ").unwrap();
        assert_eq!(handle.as_str(), "some.user");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(Handle::parse(""), Err(CheckError::InvalidInput(_))));
        assert!(matches!(Handle::parse(" @ "), Err(CheckError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_length_boundary() {
        let thirty = "a".repeat(30);
        assert!(Handle::parse(&thirty).is_ok());

        let thirty_one = "a".repeat(31);
        assert!(matches!(
            Handle::parse(&thirty_one),
            Err(CheckError::InvalidInput(_))
        ));

        // The @ does not count toward the limit
        assert!(Handle::parse(&format!("@{thirty}")).is_ok());
    }

    #[test]
    fn test_parse_rejects_characters_outside_alphabet() {
        for raw in ["ana#evil", "ana?x=1", "ana/followers", "an@a", "some user", "ána"] {
            assert!(
                matches!(Handle::parse(raw), Err(CheckError::InvalidInput(_))),
                "{raw} should be rejected"
            );
        }
        assert_eq!(Handle::parse("@Ana_B.99").unwrap().as_str(), "ana_b.99");
    }

    #[test]
    fn test_normalize_entry_matches_parse() {
        assert_eq!(normalize_entry("@Bob"), "bob");
        assert_eq!(normalize_entry("bob"), "bob");
        assert_eq!(
            normalize_entry("MixedCase"),
            Handle::parse("MixedCase").unwrap().into_inner()
        );
    }
}
