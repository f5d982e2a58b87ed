//! HTTP middleware.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::state::AppState;

/// Guard for mutating routes.
///
/// When an API token is configured, requests must present it as
/// `Authorization: Bearer <token>`. With no token configured the guard
/// admits everything (development mode; a warning is logged at startup).
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_token() else {
        return next.run(request).await;
    };

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            debug!("rejected request with invalid API token");
            (StatusCode::UNAUTHORIZED, "Invalid token").into_response()
        }
        None => (StatusCode::UNAUTHORIZED, "Authentication required").into_response(),
    }
}
