//! HTTP server setup and routing
//!
//! Sets up the Axum HTTP server with control endpoints and SSE.

use crate::content::ContentSource;
use crate::error::{Error, Result};
use crate::playback::NavigationHandle;
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub navigation: NavigationHandle,
    pub source: Arc<dyn ContentSource>,
}

/// Build the router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health and build identification
        .route("/health", get(super::handlers::health))
        .route("/build_info", get(super::handlers::get_build_info))

        // Articles
        .route("/articles", get(super::handlers::list_articles))
        .route("/articles/select", post(super::handlers::select_article))

        // Chunk navigation
        .route("/playback/chunk", post(super::handlers::select_chunk))
        .route("/playback/next", post(super::handlers::step_next))
        .route("/playback/previous", post(super::handlers::step_previous))

        // Audio output
        .route("/audio/devices", get(super::handlers::list_audio_devices))

        // Session state
        .route("/session", get(super::handlers::get_session))

        // SSE event stream
        .route("/events", get(super::sse::event_stream))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())

        // Enable CORS for the browser reader UI
        .layer(CorsLayer::permissive())
}

/// Run HTTP API server until `shutdown` resolves
pub async fn run<F>(port: u16, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
