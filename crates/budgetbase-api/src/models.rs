use budgetbase_auth::{AuthError, Identity, SignupFields};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Balance as sent by clients: a JSON number or a numeric string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BalanceInput {
    Number(f64),
    Text(String),
}

/// Request to create an account
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[schema(example = "1990-01-01")]
    pub date_of_birth: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub balance: Option<BalanceInput>,
}

impl SignupRequest {
    /// Convert into service input.
    ///
    /// Missing fields are reported ahead of an unparseable balance string.
    pub fn into_fields(self) -> Result<SignupFields, AuthError> {
        let (balance, balance_error) = match self.balance {
            None => (None, None),
            Some(BalanceInput::Number(n)) => (Some(n), None),
            Some(BalanceInput::Text(text)) if text.trim().is_empty() => (None, None),
            Some(BalanceInput::Text(text)) => match text.trim().parse::<f64>() {
                Ok(n) => (Some(n), None),
                Err(_) => (
                    None,
                    Some(AuthError::invalid_field("balance", "must be a number")),
                ),
            },
        };

        let fields = SignupFields {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password: self.password,
            date_of_birth: self.date_of_birth,
            balance,
        };

        let Some(balance_error) = balance_error else {
            return Ok(fields);
        };

        let mut missing = fields.missing_fields();
        missing.retain(|name| name != "balance");
        if missing.is_empty() {
            Err(balance_error)
        } else {
            Err(AuthError::missing_fields(missing))
        }
    }
}

/// Email/password credential
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Session token issued by signup and signin
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Public view of an identity (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for UserProfile {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            email: identity.email.clone(),
            date_of_birth: identity.date_of_birth,
            balance: identity.balance,
            created_at: identity.created_at,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Registered users
    pub users: u64,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Required fields that were absent or blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
}
