//! Bearer-token authentication for the chat front end.
//!
//! Every `/api/v1` route is called by the bot front end, never by players
//! directly, so a single shared token guards them all. The player's account
//! id travels in the request itself.

use super::AppState;
use crate::logging::log_security_event;
use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Reject requests whose `Authorization: Bearer <token>` does not match
/// the configured front-end token.
///
/// - **Missing header or wrong scheme**: `401 Unauthorized`
/// - **Wrong token**: `401 Unauthorized`
pub async fn frontend_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(presented) = presented else {
        log_security_event("missing_frontend_token", None, request.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    };

    if token_matches(presented, &state.frontend_token) {
        Ok(next.run(request).await)
    } else {
        log_security_event("bad_frontend_token", None, request.uri().path());
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// Constant-time comparison; only the length leaks.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
