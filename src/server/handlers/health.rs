use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": state.settings.service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
        "started_at": state.started_at.to_rfc3339(),
        "endpoints": {
            "chat": "/get",
            "ask": "/api/ask",
            "health": "/health"
        }
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": state.settings.service.name
    }))
}
