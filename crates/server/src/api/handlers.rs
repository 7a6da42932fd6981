use crate::config::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// POST /mcp: one JSON-RPC message in, its response out
pub async fn mcp_request(State(state): State<Arc<AppState>>, body: String) -> Response {
    match state.mcp.handle_line(&body).await {
        Some(response) => Json(response).into_response(),
        // Notifications have no reply
        None => StatusCode::ACCEPTED.into_response(),
    }
}
