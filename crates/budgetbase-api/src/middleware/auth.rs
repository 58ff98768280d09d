//! Session Authentication Middleware
//!
//! Extracts the session token from the Authorization header, resolves it to a
//! stored identity through the auth service, and makes that identity available
//! to handlers via Axum's Extension.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use budgetbase_auth::Identity;
use std::sync::Arc;

use crate::error::{api_error, unauthorized, ApiError};
use crate::AppState;

/// Authenticated identity attached to the request
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

/// Pull the token out of an Authorization header value.
///
/// Accepts `Bearer <token>` (scheme matched case-insensitively) as well as a
/// bare token with no scheme.
fn token_from_header(value: &str) -> Option<&str> {
    let value = value.trim();
    match value.split_once(char::is_whitespace) {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            (!token.is_empty() && !token.contains(char::is_whitespace)).then_some(token)
        }
        Some(_) => None,
        None => (!value.is_empty() && !value.eq_ignore_ascii_case("bearer")).then_some(value),
    }
}

/// Authentication middleware for protected routes
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - The Authorization header is missing
/// - The header is not `Bearer <token>` or a bare token
/// - The token is malformed, forged or expired
/// - The identity the token names no longer exists
///
/// Returns 500 if the credential store cannot be reached.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header", "MISSING_AUTH"))?;

    let token = auth_header.to_str().ok().and_then(token_from_header).ok_or_else(|| {
        unauthorized(
            "Invalid Authorization header format. Expected 'Bearer <token>'",
            "INVALID_AUTH_FORMAT",
        )
    })?;

    let identity = state.auth.resolve_identity(token).await.map_err(api_error)?;

    request.extensions_mut().insert(AuthUser(identity));

    Ok(next.run(request).await)
}
