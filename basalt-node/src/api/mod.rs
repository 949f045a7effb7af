//! REST API implementation for the playback node
//!
//! One guild-scoped player resource per session, plus track loading and the
//! per-session event stream.

pub mod handlers;
pub mod sse;

use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::session::SessionRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}

/// Create the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))
        // API v1 routes
        .nest(
            "/v1",
            Router::new()
                // Session lifecycle
                .route("/sessions", post(handlers::create_session))
                .route("/sessions/:session_id", axum::routing::delete(handlers::delete_session))
                .route("/sessions/:session_id/events", get(sse::event_stream))
                // Player resources
                .route("/sessions/:session_id/players", get(handlers::list_players))
                .route(
                    "/sessions/:session_id/players/:guild_id",
                    get(handlers::get_player)
                        .patch(handlers::update_player)
                        .delete(handlers::delete_player),
                )
                // Track resolution
                .route("/loadtracks", get(handlers::load_tracks))
                .route("/decodetrack", get(handlers::decode_track)),
        )
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check(State(_ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "basalt-node",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
