//! Mock authenticator for testing.
//!
//! Implements the `Authenticator` port without a token backend or a
//! credential store.
//!
//! # Example
//!
//! ```ignore
//! use cluster_hub::adapters::auth::MockAuthenticator;
//! use cluster_hub::domain::foundation::{Identity, LoginId};
//!
//! let auth = MockAuthenticator::new()
//!     .with_token("valid-token", Identity::new(LoginId::new(7), false, false));
//!
//! let result = auth.verify_token("valid-token").await;
//! assert!(result.is_ok());
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Identity};
use crate::ports::Authenticator;

/// Mock authenticator.
///
/// Unknown tokens return `InvalidToken`, unknown users or wrong passwords
/// return `InvalidCredentials`.
#[derive(Debug, Default)]
pub struct MockAuthenticator {
    tokens: RwLock<HashMap<String, Identity>>,
    users: RwLock<HashMap<String, (String, Identity)>>,
    /// Optional error to return for every check (for error testing)
    force_error: RwLock<Option<AuthError>>,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to an identity.
    pub fn with_token(self, token: impl Into<String>, identity: Identity) -> Self {
        self.add_token(token, identity);
        self
    }

    /// Adds a username/password pair.
    pub fn with_user(self, username: impl Into<String>, password: impl Into<String>, identity: Identity) -> Self {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(username.into(), (password.into(), identity));
        self
    }

    /// Forces all checks to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    /// Registers a new valid token at runtime.
    pub fn add_token(&self, token: impl Into<String>, identity: Identity) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), identity);
    }

    /// Removes a token, making it invalid.
    pub fn remove_token(&self, token: &str) {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner).remove(token);
    }

    fn forced_error(&self) -> Option<AuthError> {
        self.force_error.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        if let Some(error) = self.forced_error() {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
            .ok_or(AuthError::InvalidToken)
    }

    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        if let Some(error) = self.forced_error() {
            return Err(error);
        }

        match self.users.read().unwrap_or_else(PoisonError::into_inner).get(username) {
            Some((expected, identity)) if expected == password => Ok(*identity),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::LoginId;

    fn identity(id: i64) -> Identity {
        Identity::new(LoginId::new(id), false, false)
    }

    #[tokio::test]
    async fn known_token_returns_identity() {
        let auth = MockAuthenticator::new().with_token("t1", identity(7));
        assert_eq!(auth.verify_token("t1").await.unwrap(), identity(7));
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let auth = MockAuthenticator::new();
        assert!(matches!(auth.verify_token("nope").await, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn removed_token_stops_working() {
        let auth = MockAuthenticator::new().with_token("t1", identity(7));
        auth.remove_token("t1");
        assert!(auth.verify_token("t1").await.is_err());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = MockAuthenticator::new().with_user("alice", "secret", identity(3));
        assert!(auth.verify_credentials("alice", "secret").await.is_ok());
        assert!(matches!(
            auth.verify_credentials("alice", "guess").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn forced_error_overrides_everything() {
        let auth = MockAuthenticator::new()
            .with_token("t1", identity(7))
            .with_error(AuthError::LoginDisabled);
        assert!(matches!(auth.verify_token("t1").await, Err(AuthError::LoginDisabled)));
    }
}
