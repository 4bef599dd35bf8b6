//! Request guards for write endpoints.

use super::error::ApiError;
use super::AppState;
use crate::activity::Actor;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Constant-time string comparison for secrets.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Reject the request unless it carries the configured API key. Passes
/// everything through when no key is configured.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !constant_time_compare(provided, expected) {
        warn!("Rejected {} {}: bad API key", request.method(), request.uri().path());
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

/// Actor named by the `X-User-Email` header, anonymous without one.
pub fn actor_from_headers(headers: &HeaderMap) -> Actor {
    headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(Actor::from_email)
        .unwrap_or_else(Actor::anonymous)
}
