use axum::{body::Bytes, extract::State, http::StatusCode, Extension, Json};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::error::{api_error, ApiError};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Decode a JSON body whatever its Content-Type; an empty body is `{}`
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected request body: {}", e);
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "Malformed JSON body".to_string(),
                code: Some("VALIDATION_ERROR".to_string()),
                missing_fields: None,
            }),
        )
    })
}

/// API landing message
#[utoipa::path(
    get,
    path = "/api",
    responses(
        (status = 200, description = "Welcome message", body = String)
    ),
    tag = "system"
)]
pub async fn welcome() -> &'static str {
    "Welcome to the Budgetbase API."
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 500, description = "Credential store unavailable", body = ErrorResponse)
    ),
    tag = "system"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let users = state.auth.user_count().await.map_err(api_error)?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        users,
    }))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = TokenResponse),
        (status = 422, description = "Missing fields or email already in use", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request: SignupRequest = parse_body(&body)?;
    debug!("Signup request received");

    let fields = request.into_fields().map_err(api_error)?;
    let token = state.auth.signup(fields).await.map_err(api_error)?;

    Ok(Json(TokenResponse { token }))
}

/// Exchange email and password for a session token
#[utoipa::path(
    post,
    path = "/api/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signin(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request: SigninRequest = parse_body(&body)?;

    let token = state
        .auth
        .signin(
            request.email.as_deref().unwrap_or_default(),
            request.password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(api_error)?;

    Ok(Json(TokenResponse { token }))
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    Extension(AuthUser(identity)): Extension<AuthUser>,
) -> Json<UserProfile> {
    Json(UserProfile::from(&identity))
}
