//! Error types and utilities for SkyStats

use thiserror::Error;

/// Result type alias for SkyStats operations
pub type Result<T> = std::result::Result<T, StatsError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Message shown when a handle fails local validation.
pub const INVALID_HANDLE_MESSAGE: &str =
    "Invalid handle. Maybe you're missing the `.bsky.social` part?";

/// Message shown for unknown actors and any other failed lookup.
pub const LOOKUP_FAILED_MESSAGE: &str =
    "This handle doesn't seem to exist. Maybe you're missing the `.bsky.social` part?";

/// Main error type for SkyStats operations
#[derive(Error, Debug)]
pub enum StatsError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Network related errors (connect, timeout, body read)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The social graph API told us to slow down
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Seconds until the remote quota resets, when the API disclosed it
        retry_after_secs: Option<u64>,
    },

    /// The requested actor does not exist on the network
    #[error("Actor not found: {actor}")]
    ActorNotFound { actor: String },

    /// Social graph API returned an error we don't special-case
    #[error("Bluesky API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key-value store errors
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Chart rendering errors
    #[error("Chart error: {message}")]
    Chart { message: String },

    /// Validation errors for user input or data
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },
}

impl StatsError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new network error with source
    pub fn network_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Create an unknown actor error
    pub fn actor_not_found(actor: impl Into<String>) -> Self {
        Self::ActorNotFound {
            actor: actor.into(),
        }
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            status_code: None,
            source: None,
        }
    }

    /// Create a new API error with status code
    pub fn api_with_status(msg: impl Into<String>, status: u16) -> Self {
        Self::Api {
            message: msg.into(),
            status_code: Some(status),
            source: None,
        }
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new store error with source
    pub fn store_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new chart error
    pub fn chart(msg: impl Into<String>) -> Self {
        Self::Chart {
            message: msg.into(),
        }
    }

    /// Create a new validation error with field name
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Text safe to show an end user in place of the raw error.
    ///
    /// Only rate limiting and local validation get a specific message;
    /// everything else collapses to the generic "doesn't exist" hint.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => format!(
                "We've hit a rate limit on the API. Please try again in {secs} seconds."
            ),
            Self::RateLimited {
                retry_after_secs: None,
            } => "We've hit a rate limit on the API. Please try again later.".to_string(),
            Self::Validation {
                field: Some(field), ..
            } if field == "handle" => INVALID_HANDLE_MESSAGE.to_string(),
            _ => LOOKUP_FAILED_MESSAGE.to_string(),
        }
    }
}

// Error conversion implementations for external types

/// Convert from reqwest::Error to StatsError
impl From<reqwest::Error> for StatsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_with_source("Request timeout", err)
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err)
        } else if err.is_decode() {
            Self::Api {
                message: "Malformed response body".to_string(),
                status_code: err.status().map(|s| s.as_u16()),
                source: Some(Box::new(err)),
            }
        } else {
            Self::network_with_source("Network request failed", err)
        }
    }
}

/// Convert from toml::de::Error to StatsError
impl From<toml::de::Error> for StatsError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML parsing error", err)
    }
}
