//! Errors surfaced at the auth service boundary

use thiserror::Error;
use tracing::error;

use crate::password::PasswordError;
use crate::store::StoreError;

/// Every failure leaving [`crate::AuthService`] is exactly one of these kinds.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed signup input
    #[error("{message}")]
    Validation {
        message: String,
        /// Request field names that were absent or blank
        missing_fields: Vec<String>,
    },

    #[error("Email is in use!")]
    DuplicateEmail,

    /// Unknown email or wrong password; deliberately undifferentiated
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Bad, expired or forged token, or the identity behind it is gone
    #[error("Unauthorized")]
    Unauthorized,

    /// Store or hasher failure. The cause is logged, never returned to callers.
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    pub fn missing_fields(fields: Vec<String>) -> Self {
        Self::Validation {
            message: "Please fill all fields!".to_string(),
            missing_fields: fields,
        }
    }

    pub fn invalid_field(field: &str, reason: &str) -> Self {
        Self::Validation {
            message: format!("Invalid {}: {}", field, reason),
            missing_fields: Vec::new(),
        }
    }

    /// Log an internal cause and collapse it into [`AuthError::Internal`]
    pub fn internal(context: &str, cause: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, cause);
        Self::Internal
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::DuplicateEmail => "EMAIL_IN_USE",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::DuplicateEmail,
            StoreError::Backend(e) => Self::internal("Credential store failure", e),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        Self::internal("Password hasher failure", err)
    }
}
