use crate::config::{AppState, ServerConfig};
use crate::middleware::auth::require_auth;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use scaffold_core::Authenticator;
use scaffold_mcp::McpServer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

mod handlers;
pub mod sse;

/// Start the HTTP/SSE server
pub async fn serve(
    config: &ServerConfig,
    mcp: McpServer,
    authenticator: Option<Arc<dyn Authenticator>>,
) -> Result<()> {
    let state = AppState::new(mcp, authenticator);

    let app = create_router(state);

    let addr = config.transport.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);
    tracing::info!("SSE endpoint: http://{}/sse", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    // Gated when an authenticator is configured
    let protected = Router::new()
        .route("/sse", get(sse::open_stream))
        .route("/mcp", post(handlers::mcp_request))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .route("/messages", post(sse::post_message))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new())
                        .on_response(DefaultOnResponse::new()),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let options = state.mcp.options();
    Json(serde_json::json!({
        "status": "ok",
        "service": options.name,
        "version": options.version,
        "sessions": state.sessions.len(),
    }))
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Error type for API handlers
pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: anyhow::anyhow!(message.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_msg = self.error.to_string();
        let details = self
            .error
            .chain()
            .skip(1)
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(": ");

        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        }

        let response = if details.is_empty() {
            ErrorResponse::new(error_msg)
        } else {
            ErrorResponse::with_details(error_msg, details)
        };

        (self.status, Json(response)).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
