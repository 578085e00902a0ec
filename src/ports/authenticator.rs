//! Authenticator port for connection authentication.
//!
//! Every client connection must authenticate exactly once, either with a
//! previously issued token or with username and password. How tokens are
//! signed and how passwords are checked is outside this crate; implementations
//! only have to map the outcome to an [`Identity`].
//!
//! # Contract
//!
//! Implementations must:
//! - Return `AuthError::InvalidToken` / `TokenExpired` for bad tokens
//! - Return `AuthError::InvalidCredentials` for rejected passwords
//! - Return `AuthError::LoginDisabled` for disabled logins
//! - Return `AuthError::ServiceUnavailable` for transient errors

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Identity};

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Validate an access token and return the identity it was issued for.
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;

    /// Validate username and password.
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Identity, AuthError>;
}
