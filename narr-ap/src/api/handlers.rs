//! HTTP request handlers
//!
//! Thin layer over the navigation handle and the content source. Navigation
//! errors map to status codes; fetch/playback failures of the audio itself
//! are not request errors and show up in the session and event stream.

use crate::api::server::AppContext;
use crate::audio::list_output_devices;
use crate::error::Error;
use axum::{extract::State, http::StatusCode, Json};
use narr_common::events::SessionSnapshot;
use narr_common::model::ArticleSummary;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    devices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    articles: Vec<ArticleSummary>,
}

#[derive(Debug, Deserialize)]
pub struct SelectArticleRequest {
    path: String,
}

#[derive(Debug, Serialize)]
pub struct SelectArticleResponse {
    path: String,
    title: String,
    chunk_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SelectChunkRequest {
    index: usize,
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    /// False when the step was a no-op (at a boundary or nothing selected)
    moved: bool,
    current_chunk_index: Option<usize>,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::OutOfRange { .. } => StatusCode::BAD_REQUEST,
        Error::NoArticleSelected | Error::SelectionSuperseded(_) => StatusCode::CONFLICT,
        Error::EmptyArticle(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Fetch(_) => StatusCode::BAD_GATEWAY,
        Error::EngineStopped => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: Error) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", err),
        }),
    )
}

// ============================================================================
// Health / Build Info
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "narration_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /build_info
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

// ============================================================================
// Audio Device Endpoints
// ============================================================================

/// GET /audio/devices - Output devices usable with `sink = "device"`
pub async fn list_audio_devices() -> Result<Json<DeviceListResponse>, ApiError> {
    let devices = list_output_devices().map_err(api_error)?;
    info!("Found {} audio devices", devices.len());
    Ok(Json(DeviceListResponse { devices }))
}

// ============================================================================
// Article Endpoints
// ============================================================================

/// GET /articles - Article catalog from the content server
pub async fn list_articles(
    State(ctx): State<AppContext>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let articles = ctx.source.list_articles().await.map_err(api_error)?;
    Ok(Json(ArticleListResponse { articles }))
}

/// POST /articles/select - Fetch an article's chunks and start narrating it
pub async fn select_article(
    State(ctx): State<AppContext>,
    Json(req): Json<SelectArticleRequest>,
) -> Result<Json<SelectArticleResponse>, ApiError> {
    info!(path = %req.path, "Select article request");

    // Overlapping selections resolve in request order, whichever fetch is slower
    let ticket = ctx.navigation.reserve_selection();
    let mut article = ctx.source.fetch_article(&req.path).await.map_err(api_error)?;
    if article.path.is_empty() {
        article.path = req.path;
    }

    let response = SelectArticleResponse {
        path: article.path.clone(),
        title: article.title.clone(),
        chunk_count: article.chunks.len(),
    };

    ctx.navigation
        .select_reserved(ticket, article)
        .await
        .map_err(api_error)?;

    Ok(Json(response))
}

// ============================================================================
// Navigation Endpoints
// ============================================================================

/// POST /playback/chunk - Jump to a chunk (restarts it if already current)
pub async fn select_chunk(
    State(ctx): State<AppContext>,
    Json(req): Json<SelectChunkRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.navigation
        .select_chunk(req.index)
        .await
        .map_err(api_error)?;

    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /playback/next
pub async fn step_next(State(ctx): State<AppContext>) -> Result<Json<StepResponse>, ApiError> {
    let moved = ctx.navigation.step_next().await.map_err(api_error)?;
    Ok(Json(StepResponse {
        moved,
        current_chunk_index: ctx.state.current_index().await,
    }))
}

/// POST /playback/previous
pub async fn step_previous(
    State(ctx): State<AppContext>,
) -> Result<Json<StepResponse>, ApiError> {
    let moved = ctx.navigation.step_prev().await.map_err(api_error)?;
    Ok(Json(StepResponse {
        moved,
        current_chunk_index: ctx.state.current_index().await,
    }))
}

/// GET /session - Current article, highlighted chunk and playback status
pub async fn get_session(State(ctx): State<AppContext>) -> Json<SessionSnapshot> {
    Json(ctx.state.snapshot().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_errors_map_to_client_statuses() {
        assert_eq!(
            status_for(&Error::OutOfRange { index: 5, len: 3 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&Error::NoArticleSelected), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&Error::SelectionSuperseded("a".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&Error::EmptyArticle("a".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_collaborator_errors_map_to_server_statuses() {
        assert_eq!(status_for(&Error::Fetch("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&Error::PlaybackFailure("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(&Error::EngineStopped), StatusCode::SERVICE_UNAVAILABLE);
    }
}
