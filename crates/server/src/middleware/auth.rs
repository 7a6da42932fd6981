use crate::config::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use scaffold_core::Credentials;
use std::sync::Arc;

/// Reject the request with 401 unless the configured authenticator accepts it
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(authenticator) = state.authenticator.as_ref() else {
        return next.run(req).await;
    };

    let authorized = {
        let credentials = Credentials::new(req.headers(), req.uri().query());
        authenticator.authenticate(&credentials).await
    };

    if !authorized {
        tracing::warn!(
            "Rejected {} {} ({})",
            req.method(),
            req.uri().path(),
            authenticator.scheme()
        );
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    next.run(req).await
}
