//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;
use crate::ports::LoginLimits;

/// Minimum secret length accepted in production.
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Access token and login throttling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 signing secret for access tokens
    pub jwt_secret: SecretString,

    /// Clock skew tolerated when checking token expiry
    #[serde(default = "default_token_leeway")]
    pub token_leeway_secs: u64,

    /// Failed authentication attempts tolerated per host and window
    #[serde(default = "default_login_attempts")]
    pub login_attempts_per_window: u32,

    /// Length of the failed-attempt window in seconds
    #[serde(default = "default_login_window")]
    pub login_window_secs: u32,
}

impl AuthConfig {
    /// Login limits used until instance settings are loaded.
    pub fn login_limits(&self) -> LoginLimits {
        LoginLimits {
            attempts_per_window: self.login_attempts_per_window,
            window_secs: self.login_window_secs,
        }
    }

    /// Validate authentication configuration
    ///
    /// Production requires a secret of at least 32 bytes.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ValidationError::JwtSecretTooShort);
        }
        if self.login_attempts_per_window == 0 || self.login_window_secs == 0 {
            return Err(ValidationError::InvalidLoginLimit);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::new(String::new()),
            token_leeway_secs: default_token_leeway(),
            login_attempts_per_window: default_login_attempts(),
            login_window_secs: default_login_window(),
        }
    }
}

fn default_token_leeway() -> u64 {
    30
}

fn default_login_attempts() -> u32 {
    10
}

fn default_login_window() -> u32 {
    300
}
