//! Bluesky social graph client with pagination and rate limiting
//!
//! Followers and follows are read through `app.bsky.graph.getFollowers` and
//! `app.bsky.graph.getFollows`, one page at a time, following the opaque
//! cursor until the server stops returning one. When credentials are
//! configured a session is opened through `com.atproto.server.createSession`
//! and its access token is sent as a bearer token.

use crate::aggregator::TimedRecord;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skystats_common::{now_epoch_seconds, Result, StatsError};
use skystats_config::BlueskyConfig;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const GET_FOLLOWERS: &str = "app.bsky.graph.getFollowers";
const GET_FOLLOWS: &str = "app.bsky.graph.getFollows";
const CREATE_SESSION: &str = "com.atproto.server.createSession";

/// Header carrying the epoch second at which the rate-limit window resets.
pub const RATELIMIT_RESET_HEADER: &str = "ratelimit-reset";

/// A profile as returned in follower and follow lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    /// Decentralized identifier.
    pub did: String,
    /// Current handle.
    pub handle: String,
    /// Chosen display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// When the profile record was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// When the AppView last indexed the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

impl ProfileView {
    /// A bare profile, handy for tests and fixtures.
    pub fn new(did: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            handle: handle.into(),
            display_name: None,
            avatar: None,
            created_at: None,
            indexed_at: None,
        }
    }

    /// Sets `createdAt`.
    pub fn created(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }
}

impl TimedRecord for ProfileView {
    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// Source of an actor's follower and follow lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialGraphSource: Send + Sync {
    /// Every account following `actor`.
    async fn followers(&self, actor: &str) -> Result<Vec<ProfileView>>;

    /// Every account `actor` follows.
    async fn follows(&self, actor: &str) -> Result<Vec<ProfileView>>;
}

trait ListPage: DeserializeOwned {
    fn into_parts(self) -> (Vec<ProfileView>, Option<String>);
}

#[derive(Debug, Deserialize)]
struct FollowersPage {
    #[serde(default)]
    followers: Vec<ProfileView>,
    cursor: Option<String>,
}

impl ListPage for FollowersPage {
    fn into_parts(self) -> (Vec<ProfileView>, Option<String>) {
        (self.followers, self.cursor)
    }
}

#[derive(Debug, Deserialize)]
struct FollowsPage {
    #[serde(default)]
    follows: Vec<ProfileView>,
    cursor: Option<String>,
}

impl ListPage for FollowsPage {
    fn into_parts(self) -> (Vec<ProfileView>, Option<String>) {
        (self.follows, self.cursor)
    }
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    access_jwt: String,
}

/// XRPC error body.
#[derive(Debug, Default, Deserialize)]
struct XrpcError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl XrpcError {
    fn describe(&self) -> String {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => format!("{error}: {message}"),
            (Some(error), None) => error.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "no error details".to_string(),
        }
    }

    fn is_unknown_actor(&self) -> bool {
        let message = self.message.as_deref().unwrap_or_default().to_ascii_lowercase();
        message.contains("not found")
            || message.contains("could not find")
            || self.error.as_deref() == Some("ActorNotFound")
    }

    fn is_expired_token(&self) -> bool {
        self.error.as_deref() == Some("ExpiredToken")
    }
}

/// HTTP client for the Bluesky XRPC API.
#[derive(Debug, Clone)]
pub struct BlueskyClient {
    client: Client,
    base_url: Url,
    page_limit: u8,
    max_pages: usize,
    credentials: Option<(String, String)>,
    session: Arc<RwLock<Option<String>>>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl BlueskyClient {
    /// Builds a client from the `bluesky` configuration section.
    pub fn new(config: &BlueskyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| StatsError::network_with_source("Failed to create HTTP client", e))?;

        let base_url = Url::parse(&config.service_url).map_err(|e| {
            StatsError::config_with_source(
                format!("Invalid service URL '{}'", config.service_url),
                e,
            )
        })?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.rate_limit_per_sec)
                .ok_or_else(|| StatsError::config("Rate limit must be greater than 0"))?,
        );
        let rate_limiter = Arc::new(DefaultDirectRateLimiter::direct(quota));

        let credentials = match (&config.identifier, &config.password) {
            (Some(identifier), Some(password)) => Some((identifier.clone(), password.clone())),
            _ => None,
        };
        info!(
            "Bluesky client for {} ({})",
            base_url,
            if credentials.is_some() {
                "authenticated"
            } else {
                "anonymous"
            }
        );

        Ok(Self {
            client,
            base_url,
            page_limit: config.page_limit.clamp(1, 100),
            max_pages: config.max_pages.max(1),
            credentials,
            session: Arc::new(RwLock::new(None)),
            rate_limiter,
        })
    }

    fn xrpc_url(&self, method: &str) -> Result<Url> {
        self.base_url
            .join(&format!("xrpc/{method}"))
            .map_err(|e| StatsError::config_with_source(format!("Cannot build URL for {method}"), e))
    }

    /// Bearer token for the current session, logging in on first use.
    async fn access_token(&self) -> Result<Option<String>> {
        let Some((identifier, password)) = &self.credentials else {
            return Ok(None);
        };
        if let Some(token) = self.session.read().await.clone() {
            return Ok(Some(token));
        }

        let mut session = self.session.write().await;
        if let Some(token) = session.clone() {
            return Ok(Some(token));
        }

        self.rate_limiter.until_ready().await;
        info!("Opening Bluesky session for {}", identifier);
        let response = self
            .client
            .post(self.xrpc_url(CREATE_SESSION)?)
            .json(&SessionRequest {
                identifier,
                password,
            })
            .send()
            .await?;
        let response = check_status(response, identifier).await?;
        let created: SessionResponse = response.json().await?;

        *session = Some(created.access_jwt.clone());
        Ok(Some(created.access_jwt))
    }

    async fn send(&self, request: RequestBuilder, actor: &str) -> Result<Response> {
        self.rate_limiter.until_ready().await;
        let request = match self.access_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;

        let result = check_status(response, actor).await;
        if matches!(&result, Err(StatsError::Api { message, .. }) if message.starts_with("ExpiredToken")) {
            warn!("Bluesky session expired; will log in again on next request");
            self.session.write().await.take();
        }
        result
    }

    #[instrument(skip(self))]
    async fn fetch_list<P: ListPage>(&self, method: &str, actor: &str) -> Result<Vec<ProfileView>> {
        let url = self.xrpc_url(method)?;
        let limit = self.page_limit.to_string();
        let mut profiles = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=self.max_pages {
            let mut query = vec![("actor", actor), ("limit", limit.as_str())];
            if let Some(cursor) = cursor.as_deref() {
                query.push(("cursor", cursor));
            }

            let response = self.send(self.client.get(url.clone()).query(&query), actor).await?;
            let body: P = response.json().await?;
            let (items, next) = body.into_parts();
            debug!("Page {} returned {} profiles", page, items.len());
            profiles.extend(items);

            match next.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => {
                    info!("Fetched {} profiles for {}", profiles.len(), actor);
                    return Ok(profiles);
                }
            }
        }

        warn!(
            "Stopped after {} pages for {}; returning {} profiles",
            self.max_pages,
            actor,
            profiles.len()
        );
        Ok(profiles)
    }
}

#[async_trait]
impl SocialGraphSource for BlueskyClient {
    async fn followers(&self, actor: &str) -> Result<Vec<ProfileView>> {
        self.fetch_list::<FollowersPage>(GET_FOLLOWERS, actor).await
    }

    async fn follows(&self, actor: &str) -> Result<Vec<ProfileView>> {
        self.fetch_list::<FollowsPage>(GET_FOLLOWS, actor).await
    }
}

/// Maps non-success responses onto the error taxonomy.
async fn check_status(response: Response, actor: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RATELIMIT_RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|reset| seconds_until(reset, now_epoch_seconds()));
        warn!("Rate limited by Bluesky (retry after {:?}s)", retry_after);
        return Err(StatsError::rate_limited(retry_after));
    }

    let body: XrpcError = response.json().await.unwrap_or_default();
    if status == StatusCode::BAD_REQUEST && body.is_unknown_actor() {
        debug!("Unknown actor {}: {}", actor, body.describe());
        return Err(StatsError::actor_not_found(actor));
    }

    let message = if body.is_expired_token() {
        "ExpiredToken: session expired".to_string()
    } else {
        body.describe()
    };
    error!("Bluesky returned {}: {}", status, message);
    Err(StatsError::api_with_status(message, status.as_u16()))
}

/// Whole seconds from `now` until the `reset` epoch second, never negative.
pub fn seconds_until(reset: i64, now: f64) -> u64 {
    let remaining = (reset as f64 - now).ceil();
    if remaining > 0.0 {
        remaining as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_view_decodes_api_shape() {
        let json = r#"{
            "did": "did:plc:abc",
            "handle": "alice.bsky.social",
            "displayName": "Alice",
            "createdAt": "2024-01-05T10:00:00.000Z",
            "indexedAt": "2024-01-05T10:00:01.000Z",
            "labels": []
        }"#;
        let profile: ProfileView = serde_json::from_str(json).unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(
            TimedRecord::created_at(&profile),
            Some("2024-01-05T10:00:00.000Z")
        );

        let bare: ProfileView =
            serde_json::from_str(r#"{"did":"did:plc:x","handle":"x.bsky.social"}"#).unwrap();
        assert_eq!(TimedRecord::created_at(&bare), None);
    }

    #[test]
    fn test_seconds_until_clamps_at_zero() {
        assert_eq!(seconds_until(1_000, 940.0), 60);
        assert_eq!(seconds_until(1_000, 999.2), 1);
        assert_eq!(seconds_until(1_000, 1_000.0), 0);
        assert_eq!(seconds_until(1_000, 5_000.0), 0);
    }

    #[test]
    fn test_xrpc_error_classification() {
        let missing = XrpcError {
            error: Some("InvalidRequest".to_string()),
            message: Some("Profile not found".to_string()),
        };
        assert!(missing.is_unknown_actor());

        let other = XrpcError {
            error: Some("InvalidRequest".to_string()),
            message: Some("Error: limit must be <= 100".to_string()),
        };
        assert!(!other.is_unknown_actor());
        assert_eq!(
            other.describe(),
            "InvalidRequest: Error: limit must be <= 100"
        );
    }

    #[test]
    fn test_client_rejects_zero_rate() {
        let config = BlueskyConfig {
            rate_limit_per_sec: 0,
            ..BlueskyConfig::default()
        };
        assert!(BlueskyClient::new(&config).is_err());
    }

    #[test]
    fn test_xrpc_url_keeps_base_path() {
        let config = BlueskyConfig {
            service_url: "https://example.test/".to_string(),
            ..BlueskyConfig::default()
        };
        let client = BlueskyClient::new(&config).unwrap();
        assert_eq!(
            client.xrpc_url(GET_FOLLOWS).unwrap().as_str(),
            "https://example.test/xrpc/app.bsky.graph.getFollows"
        );
    }
}
