//! Application-wide error types using thiserror.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skystats_common::StatsError;
use skystats_stats::{FailureKind, LookupFailure};
use tracing::error;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    /// Startup failed while building the application from its configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] StatsError),

    /// Socket or file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the web application.
pub type WebResult<T> = Result<T, WebError>;

/// A handler failure rendered as a JSON error response.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    body: serde_json::Value,
    retry_after: Option<u64>,
}

impl HttpError {
    /// Maps a failed lookup onto a status code, keeping its user-facing body.
    pub fn from_failure(failure: &LookupFailure) -> Self {
        let (status, retry_after) = match failure.kind {
            FailureKind::InvalidHandle => (StatusCode::BAD_REQUEST, None),
            FailureKind::RateLimited { retry_after_secs } => {
                (StatusCode::TOO_MANY_REQUESTS, retry_after_secs)
            }
            FailureKind::NotFound => (StatusCode::NOT_FOUND, None),
            FailureKind::Unavailable => (StatusCode::BAD_GATEWAY, None),
        };
        Self {
            status,
            body: serde_json::to_value(failure).unwrap_or_else(|_| json!({ "message": failure.message })),
            retry_after,
        }
    }

    /// An internal failure; the detail is logged, not returned.
    pub fn internal(context: &str, error: &StatsError) -> Self {
        error!("{}: {}", context, error);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({
                "kind": "internal",
                "message": "Something went wrong on our side. Please try again later.",
            }),
            retry_after: None,
        }
    }

    /// Status code of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<LookupFailure> for HttpError {
    fn from(failure: LookupFailure) -> Self {
        Self::from_failure(&failure)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
