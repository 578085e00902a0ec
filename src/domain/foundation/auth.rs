//! Authentication types for the domain layer.
//!
//! These types describe who is behind a client connection once it has
//! authenticated. Any token or credential backend can populate them via the
//! `Authenticator` port.

use super::LoginId;
use thiserror::Error;

/// Identity attached to a connection after a successful `auth` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// The authenticated login.
    pub login_id: LoginId,

    /// Whether the login has instance admin rights.
    pub admin: bool,

    /// Whether the login was granted access without credentials
    /// (public/anonymous access configured on the instance).
    pub no_auth: bool,
}

impl Identity {
    pub fn new(login_id: LoginId, admin: bool, no_auth: bool) -> Self {
        Self {
            login_id,
            admin,
            no_auth,
        }
    }
}

/// Authentication errors that can occur during token or credential checks.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Username/password combination was rejected.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The login exists but is disabled.
    #[error("Login disabled")]
    LoginDisabled,

    /// The authentication backend is unavailable.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if the attempt should count against the host's rate limit.
    ///
    /// Backend outages are not the client's fault and are not penalized.
    pub fn is_bad_attempt(&self) -> bool {
        !matches!(self, AuthError::ServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_holds_flags() {
        let identity = Identity::new(LoginId::new(3), true, false);
        assert_eq!(identity.login_id, LoginId::new(3));
        assert!(identity.admin);
        assert!(!identity.no_auth);
    }

    #[test]
    fn outages_are_not_bad_attempts() {
        assert!(!AuthError::service_unavailable("db down").is_bad_attempt());
        assert!(AuthError::InvalidToken.is_bad_attempt());
        assert!(AuthError::InvalidCredentials.is_bad_attempt());
    }
}
