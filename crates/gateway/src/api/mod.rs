//! HTTP/WebSocket surface: the three endpoints `spec.md` §6 names, wired
//! onto a shared [`AppState`].

pub mod chat;
pub mod stats;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat", post(chat::chat))
        .route("/v1/chat/stream", get(chat::chat_stream))
        .route("/v1/relay/ws", get(ws::relay_ws))
        .route("/v1/stats", get(stats::stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
