//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),

    /// Cost parameters rejected by Argon2
    #[error("Invalid hash parameters: {0}")]
    InvalidParams(String),
}

/// Argon2id cost parameters.
///
/// The defaults match the argon2 crate defaults (OWASP recommendation):
/// 19 MiB of memory, 2 iterations, 1 lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted one-way password hasher.
///
/// Every call to [`PasswordHasher::hash`] draws a fresh 16-byte salt from the OS
/// and embeds it in the PHC string, so no separate salt column is needed.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: HashConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password, returning a PHC-formatted string
    /// (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<digest>`).
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// The cost parameters and salt are read from the hash itself, so hashes
    /// produced under a different [`HashConfig`] still verify. The final digest
    /// comparison is constant-time.
    ///
    /// # Returns
    /// * `Ok(true)` - Password matches hash
    /// * `Ok(false)` - Password does not match hash
    /// * `Err(PasswordError)` - If hash format is invalid or verification fails
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}
