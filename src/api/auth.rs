//! API-key guard for the `/clusters` routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::error::ApiError;
use super::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without the configured `X-API-Key`.
///
/// With no key configured every request passes.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if provided.is_empty() {
        return Err(ApiError::Unauthorized("API key is required"));
    }
    if !keys_match(provided.as_bytes(), expected.as_bytes()) {
        return Err(ApiError::Unauthorized("Invalid API key"));
    }

    Ok(next.run(request).await)
}

/// Comparison time depends only on the lengths.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
