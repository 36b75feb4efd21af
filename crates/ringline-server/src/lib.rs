//! Ringline server library logic.

pub mod api_media;
pub mod config;

use axum::{routing::get, Extension, Json, Router};
use ringline_bridge::BridgeDeps;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Collaborators handed to every bridged call.
    pub bridge: Arc<BridgeDeps>,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/media-stream", get(api_media::media_stream_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
