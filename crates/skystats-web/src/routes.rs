//! HTTP routes and handlers.

use crate::error::HttpError;
use crate::pages;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skystats_common::Handle;
use skystats_stats::chart::{build_points, render_svg, ChartOptions};
use skystats_stats::StatsReport;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

/// Query of the search form.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Free-form handle input.
    pub handle: Option<String>,
}

/// Period selection on stats pages and charts.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    /// `month`, `week`, or `day`.
    pub period: Option<String>,
}

/// Like counter payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikesResponse {
    /// Current number of likes.
    pub likes_count: u64,
}

/// Builds the application router.
pub fn create_router(state: AppState, permissive_cors: bool) -> Router {
    let api = Router::new()
        .route("/stats/:handle", get(get_stats).delete(delete_stats))
        .route("/likes", get(get_likes).post(post_like));
    let api = if permissive_cors {
        api.layer(CorsLayer::permissive())
    } else {
        api
    };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/like", post(like_form))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .route("/:handle", get(stats_page))
        .route("/:handle/chart.svg", get(chart_svg))
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn current_likes(state: &AppState) -> Option<u64> {
    match state.likes.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Could not read like count: {}", e);
            None
        }
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(pages::landing_page(current_likes(&state).await))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Normalizes search input and redirects to its stats page.
async fn search(Query(query): Query<SearchQuery>) -> Redirect {
    let raw = query.handle.unwrap_or_default();
    if raw.trim().is_empty() {
        return Redirect::to("/");
    }
    let normalized = Handle::normalize_input(&raw);
    debug!("Search for {:?} redirects to {:?}", raw, normalized);
    Redirect::to(&handle_path(&normalized))
}

/// Percent-encoded `/{handle}` path.
fn handle_path(handle: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(handle.as_bytes()).collect();
    format!("/{encoded}")
}

async fn stats_page(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Html<String> {
    let granularity = state.period(query.period.as_deref());
    let outcome = state.service.lookup(&handle).await;
    let likes = current_likes(&state).await;
    Html(pages::stats_page(&handle, &outcome, granularity, likes))
}

async fn chart_svg(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, HttpError> {
    let granularity = state.period(query.period.as_deref());
    let report = state.service.lookup(&handle).await?;
    let points = build_points(
        report.follower_stats.get(granularity),
        report.follow_stats.get(granularity),
    );
    let svg = render_svg(&points, granularity, &ChartOptions::for_actor(&report.actor))
        .map_err(|e| HttpError::internal("Chart rendering failed", &e))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        svg,
    )
        .into_response())
}

async fn get_stats(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<StatsReport>, HttpError> {
    Ok(Json(state.service.lookup(&handle).await?))
}

async fn delete_stats(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<StatusCode, HttpError> {
    state.service.invalidate(&handle).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_likes(State(state): State<AppState>) -> Result<Json<LikesResponse>, HttpError> {
    let likes_count = state
        .likes
        .count()
        .await
        .map_err(|e| HttpError::internal("Reading like count failed", &e))?;
    Ok(Json(LikesResponse { likes_count }))
}

async fn post_like(State(state): State<AppState>) -> Result<Json<LikesResponse>, HttpError> {
    let likes_count = state
        .likes
        .increment()
        .await
        .map_err(|e| HttpError::internal("Incrementing like count failed", &e))?;
    Ok(Json(LikesResponse { likes_count }))
}

/// Form fallback for the header like button.
async fn like_form(State(state): State<AppState>) -> Result<Redirect, HttpError> {
    state
        .likes
        .increment()
        .await
        .map_err(|e| HttpError::internal("Incrementing like count failed", &e))?;
    Ok(Redirect::to("/"))
}
