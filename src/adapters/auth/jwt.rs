//! HS256 access token authenticator.
//!
//! Tokens are issued by the login service with the shared instance secret and
//! carry the login id in `sub`. Password checks are delegated to an optional
//! credential backend; without one, `user` authentication is unavailable.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, Identity, LoginId, Timestamp};
use crate::ports::Authenticator;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Login id as a decimal string.
    pub sub: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub no_auth: bool,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl AccessClaims {
    /// Claims for `identity` valid for `ttl_secs` from now.
    pub fn for_identity(identity: &Identity, ttl_secs: i64) -> Self {
        Self {
            sub: identity.login_id.value().to_string(),
            admin: identity.admin,
            no_auth: identity.no_auth,
            exp: Timestamp::now().plus_secs(ttl_secs).as_unix_secs(),
        }
    }
}

/// Verifies HS256 access tokens.
pub struct JwtAuthenticator {
    secret: SecretString,
    leeway_secs: u64,
    credentials: Option<Arc<dyn Authenticator>>,
}

impl JwtAuthenticator {
    pub fn new(secret: SecretString, leeway_secs: u64) -> Self {
        Self {
            secret,
            leeway_secs,
            credentials: None,
        }
    }

    /// Delegate username/password checks to another authenticator.
    pub fn with_credentials(mut self, backend: Arc<dyn Authenticator>) -> Self {
        self.credentials = Some(backend);
        self
    }

    /// Signs claims with the instance secret.
    pub fn issue(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign access token");
            AuthError::service_unavailable("token signing failed")
        })
    }

    fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        decode::<AccessClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    _ => {
                        tracing::warn!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            })
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("secret", &"[REDACTED]")
            .field("leeway_secs", &self.leeway_secs)
            .field("credentials", &self.credentials.is_some())
            .finish()
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.validate(token)?;

        let login_id: i64 = claims.sub.parse().map_err(|_| {
            tracing::warn!("Invalid login id in token: {}", claims.sub);
            AuthError::InvalidToken
        })?;
        let login_id = LoginId::new(login_id);
        if login_id.is_none() {
            return Err(AuthError::InvalidToken);
        }

        Ok(Identity::new(login_id, claims.admin, claims.no_auth))
    }

    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        match &self.credentials {
            Some(backend) => backend.verify_credentials(username, password).await,
            None => Err(AuthError::service_unavailable("password login is not configured")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockAuthenticator;

    fn authenticator() -> JwtAuthenticator {
        JwtAuthenticator::new(SecretString::new("test-secret-with-enough-entropy".to_string()), 0)
    }

    #[tokio::test]
    async fn issued_token_verifies_to_same_identity() {
        let auth = authenticator();
        let identity = Identity::new(LoginId::new(42), true, false);
        let token = auth.issue(&AccessClaims::for_identity(&identity, 60)).unwrap();

        let verified = auth.verify_token(&token).await.unwrap();
        assert_eq!(verified, identity);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = authenticator();
        let identity = Identity::new(LoginId::new(42), false, false);
        let token = auth.issue(&AccessClaims::for_identity(&identity, -120)).unwrap();

        let result = auth.verify_token(&token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let other = JwtAuthenticator::new(SecretString::new("another-secret".to_string()), 0);
        let identity = Identity::new(LoginId::new(1), false, false);
        let token = other.issue(&AccessClaims::for_identity(&identity, 60)).unwrap();

        let result = authenticator().verify_token(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let result = authenticator().verify_token("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn non_numeric_subject_is_rejected() {
        let auth = authenticator();
        let claims = AccessClaims {
            sub: "alice".to_string(),
            admin: false,
            no_auth: false,
            exp: Timestamp::now().plus_secs(60).as_unix_secs(),
        };
        let token = auth.issue(&claims).unwrap();

        assert!(matches!(auth.verify_token(&token).await, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn credentials_without_backend_are_unavailable() {
        let result = authenticator().verify_credentials("alice", "pw").await;
        assert!(matches!(result, Err(AuthError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn credentials_are_delegated_to_backend() {
        let backend = MockAuthenticator::new().with_user("alice", "pw", Identity::new(LoginId::new(5), false, false));
        let auth = authenticator().with_credentials(Arc::new(backend));

        let identity = auth.verify_credentials("alice", "pw").await.unwrap();
        assert_eq!(identity.login_id, LoginId::new(5));
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", authenticator());
        assert!(!debug.contains("test-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
