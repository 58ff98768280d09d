//! Mapping of auth failures onto HTTP responses

use axum::{http::StatusCode, Json};
use budgetbase_auth::AuthError;

use crate::models::ErrorResponse;

/// Error half of every handler's return type
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation { .. } | AuthError::DuplicateEmail => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn api_error(err: AuthError) -> ApiError {
    let missing_fields = match &err {
        AuthError::Validation { missing_fields, .. } if !missing_fields.is_empty() => {
            Some(missing_fields.clone())
        }
        _ => None,
    };

    (
        status_for(&err),
        Json(ErrorResponse {
            error: err.to_string(),
            code: Some(err.code().to_string()),
            missing_fields,
        }),
    )
}

/// 401 raised by the middleware before a token ever reaches the service
pub fn unauthorized(message: &str, code: &str) -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: Some(code.to_string()),
            missing_fields: None,
        }),
    )
}
