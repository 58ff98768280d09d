//! Signup, signin and identity resolution

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::jwt::TokenSigner;
use crate::password::PasswordHasher;
use crate::store::{normalize_email, CredentialStore, Identity, NewIdentity};

/// Compared against when signin hits an unknown email, so both rejection
/// paths pay for one Argon2 verification.
const DUMMY_PASSWORD: &str = "budgetbase-timing-equalizer";

/// Raw signup input. `None` and blank strings both count as missing.
#[derive(Debug, Clone, Default)]
pub struct SignupFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// `YYYY-MM-DD`, or an RFC 3339 timestamp whose date part is kept
    pub date_of_birth: Option<String>,
    pub balance: Option<f64>,
}

struct ValidSignup {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    date_of_birth: NaiveDate,
    balance: f64,
}

impl SignupFields {
    /// Names of the required fields that are absent or blank, in form order
    pub fn missing_fields(&self) -> Vec<String> {
        let blank =
            |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());

        [
            ("firstName", blank(&self.first_name)),
            ("lastName", blank(&self.last_name)),
            ("email", blank(&self.email)),
            // Passwords are kept verbatim; only an empty one is missing
            ("password", self.password.as_deref().map_or(true, str::is_empty)),
            ("dateOfBirth", blank(&self.date_of_birth)),
            ("balance", self.balance.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name.to_string())
        .collect()
    }

    fn validate(self) -> Result<ValidSignup, AuthError> {
        let missing = self.missing_fields();

        let first_name = present(self.first_name);
        let last_name = present(self.last_name);
        let email = present(self.email);
        let password = self.password.filter(|p| !p.is_empty());
        let date_of_birth = present(self.date_of_birth);

        let (
            Some(first_name),
            Some(last_name),
            Some(email),
            Some(password),
            Some(date_of_birth),
            Some(balance),
        ) = (
            first_name,
            last_name,
            email,
            password,
            date_of_birth,
            self.balance,
        )
        else {
            return Err(AuthError::missing_fields(missing));
        };

        if !balance.is_finite() {
            return Err(AuthError::invalid_field("balance", "must be a finite number"));
        }

        Ok(ValidSignup {
            first_name,
            last_name,
            email: normalize_email(&email),
            password,
            date_of_birth: parse_date_of_birth(&date_of_birth)?,
            balance,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date_of_birth(value: &str) -> Result<NaiveDate, AuthError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| AuthError::invalid_field("dateOfBirth", "expected YYYY-MM-DD"))
}

/// Composition root of the authentication workflow.
///
/// Holds no mutable state of its own; all shared state lives in the store,
/// so one instance is shared across requests behind an `Arc`.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenSigner,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: TokenSigner,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            store,
            hasher,
            tokens,
            dummy_hash,
        })
    }

    /// Register a new identity and return a session token for it.
    ///
    /// The record is persisted before the token is minted. A uniqueness
    /// conflict raised by the store after the pre-check passed (two racing
    /// signups) is reported as [`AuthError::DuplicateEmail`].
    pub async fn signup(&self, fields: SignupFields) -> Result<String, AuthError> {
        let signup = fields.validate()?;

        if self.store.find_by_email(&signup.email).await?.is_some() {
            debug!("Signup rejected, email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash_password(signup.password).await?;

        let identity = self
            .store
            .insert(NewIdentity {
                first_name: signup.first_name,
                last_name: signup.last_name,
                email: signup.email,
                password_hash,
                date_of_birth: signup.date_of_birth,
                balance: signup.balance,
            })
            .await?;

        info!(user_id = %identity.id, "Registered new user");

        self.issue(identity.id)
    }

    /// Check an email/password pair and return a session token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn signin(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let identity = self.store.find_by_email(&normalize_email(email)).await?;

        let hash = identity
            .as_ref()
            .map(|i| i.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());
        let matched = self.verify_password(password.to_string(), hash).await?;

        match identity {
            Some(identity) if matched => {
                info!(user_id = %identity.id, "User signed in");
                self.issue(identity.id)
            }
            _ => {
                warn!("Signin rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolve a presented session token to the stored identity
    pub async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthError> {
        let id = self.tokens.verify(token).map_err(|e| {
            warn!("Token rejected: {}", e);
            AuthError::Unauthorized
        })?;

        match self.store.find_by_id(id).await? {
            Some(identity) => Ok(identity),
            None => {
                warn!(user_id = %id, "Token subject no longer exists");
                Err(AuthError::Unauthorized)
            }
        }
    }

    pub async fn user_count(&self) -> Result<u64, AuthError> {
        Ok(self.store.count().await?)
    }

    fn issue(&self, id: Uuid) -> Result<String, AuthError> {
        self.tokens
            .issue(id)
            .map_err(|e| AuthError::internal("Failed to issue token", e))
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hash = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::internal("Hashing task failed", e))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let matched = task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::internal("Verification task failed", e))??;
        Ok(matched)
    }
}
