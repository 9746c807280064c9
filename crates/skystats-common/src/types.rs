//! Common type definitions and newtype wrappers for domain modeling.

use crate::error::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain appended to bare names typed into the search form.
pub const DEFAULT_HANDLE_DOMAIN: &str = ".bsky.social";

/// A validated Bluesky handle, e.g. `alice.bsky.social`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Shortest accepted handle length.
    pub const MIN_LEN: usize = 6;

    /// Validates a handle taken from a route or API path.
    ///
    /// A leading `@` is tolerated. The handle must contain a dot and be at
    /// least [`Handle::MIN_LEN`] characters long; whitespace and `/` are
    /// rejected. No network call is made.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let handle = trimmed.strip_prefix('@').unwrap_or(trimmed);

        if !handle.contains('.') || handle.chars().count() < Self::MIN_LEN {
            return Err(StatsError::validation_field(
                format!("'{handle}' is not a full handle"),
                "handle",
            ));
        }
        if handle.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(StatsError::validation_field(
                format!("'{handle}' contains invalid characters"),
                "handle",
            ));
        }

        Ok(Self(handle.to_string()))
    }

    /// Turns free-form search input into the path segment we redirect to.
    ///
    /// Strips a leading `@` and appends `.bsky.social` when the input has no
    /// dot. The result still has to pass [`Handle::parse`].
    pub fn normalize_input(raw: &str) -> String {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
        if bare.contains('.') {
            bare.to_string()
        } else {
            format!("{bare}{DEFAULT_HANDLE_DOMAIN}")
        }
    }

    /// The handle as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Handle {
    type Error = StatsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
