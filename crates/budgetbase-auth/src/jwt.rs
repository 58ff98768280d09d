//! Session tokens (HS256 JSON Web Tokens)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use thiserror::Error;
use uuid::Uuid;

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Subject (identity UUID)
    pub sub: String,
    /// Issued at (milliseconds since the epoch)
    pub iat: i64,
    /// Expiration time (seconds since the epoch), only present when a TTL is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn new(subject: Uuid, issued_at: DateTime<Utc>, ttl: Option<Duration>) -> Self {
        Self {
            sub: subject.to_string(),
            iat: issued_at.timestamp_millis(),
            exp: ttl.map(|ttl| (issued_at + ttl).timestamp()),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp.is_some_and(|exp| Utc::now().timestamp() > exp)
    }
}

/// Token errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),
}

/// Issues and verifies session tokens with a server-held symmetric secret.
///
/// Without a TTL the tokens carry no `exp` claim and stay valid for as long as
/// the secret does. With [`TokenSigner::with_ttl`] every token gets an `exp`
/// and verification requires it.
///
/// `iat` has millisecond resolution and [`TokenSigner::issue`] never reuses a
/// stamp, so two tokens from one signer (or its clones) always differ.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
    last_issued_ms: Arc<AtomicI64>,
}

impl TokenSigner {
    /// Create a signer using HMAC-SHA256
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: None,
            last_issued_ms: Arc::new(AtomicI64::new(i64::MIN)),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self.validation.validate_exp = true;
        self.validation.set_required_spec_claims(&["sub", "exp"]);
        self
    }

    /// Mint a token for `subject`, stamped with the current time
    pub fn issue(&self, subject: Uuid) -> Result<String, TokenError> {
        self.issue_at(subject, self.next_issue_time())
    }

    /// Current time in milliseconds, bumped past the previous stamp if the
    /// clock has not advanced since.
    fn next_issue_time(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_millis();
        let previous = match self.last_issued_ms.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |last| Some(now.max(last.saturating_add(1))),
        ) {
            Ok(previous) | Err(previous) => previous,
        };
        let stamp = now.max(previous.saturating_add(1));

        DateTime::from_timestamp_millis(stamp).unwrap_or_else(Utc::now)
    }

    /// Mint a token with an explicit issue time.
    ///
    /// Identical subject, time and secret always produce the identical token.
    pub fn issue_at(&self, subject: Uuid, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims::new(subject, issued_at, self.ttl);
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Validate signature (and expiry when configured) and return the claims
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        if token_data.claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(token_data.claims)
    }

    /// Validate a token and return the identity it was issued for
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.decode(token)?;

        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::InvalidSubject(claims.sub))
    }
}
