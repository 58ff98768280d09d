//! Authentication core for Budgetbase: password hashing, session tokens,
//! the credential store contract and the signup/signin workflow.

pub mod error;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod service;
pub mod store;

pub use error::AuthError;
pub use jwt::{TokenClaims, TokenError, TokenSigner};
pub use memory::MemoryCredentialStore;
pub use password::{HashConfig, PasswordError, PasswordHasher};
pub use service::{AuthService, SignupFields};
pub use store::{normalize_email, CredentialStore, Identity, NewIdentity, StoreError};
