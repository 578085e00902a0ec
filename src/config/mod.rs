//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CLUSTER_HUB` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use cluster_hub::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Heartbeat every {}s", config.cluster.heartbeat_interval_secs);
//! ```

mod auth;
mod cluster;
mod database;
mod error;
mod server;

pub use auth::AuthConfig;
pub use cluster::ClusterConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (shared PostgreSQL instance)
    pub database: DatabaseConfig,

    /// Heartbeat, election, mailbox and fan-out settings
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Access token and login throttling configuration
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CLUSTER_HUB` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CLUSTER_HUB__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CLUSTER_HUB__CLUSTER__HEARTBEAT_INTERVAL_SECS=30` -> `cluster.heartbeat_interval_secs = 30`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CLUSTER_HUB")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.cluster.validate()?;
        self.auth.validate(&self.server.environment)?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("CLUSTER_HUB__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("CLUSTER_HUB__AUTH__JWT_SECRET", "test-secret");
    }

    fn clear_env() {
        env::remove_var("CLUSTER_HUB__DATABASE__URL");
        env::remove_var("CLUSTER_HUB__AUTH__JWT_SECRET");
        env::remove_var("CLUSTER_HUB__SERVER__PORT");
        env::remove_var("CLUSTER_HUB__SERVER__ENVIRONMENT");
        env::remove_var("CLUSTER_HUB__CLUSTER__HEARTBEAT_INTERVAL_SECS");
        env::remove_var("CLUSTER_HUB__CLUSTER__MASTER_MISSING_AFTER_SECS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cluster_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.cluster.heartbeat_interval_secs, 60);
        assert_eq!(config.cluster.master_missing_after_secs, 180);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_cluster_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CLUSTER_HUB__CLUSTER__HEARTBEAT_INTERVAL_SECS", "10");
        env::set_var("CLUSTER_HUB__CLUSTER__MASTER_MISSING_AFTER_SECS", "20");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.cluster.heartbeat_interval_secs, 10);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MasterThresholdTooShort { .. })
        ));
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CLUSTER_HUB__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        // "test-secret" is too short for production
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_database_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CLUSTER_HUB__AUTH__JWT_SECRET", "test-secret");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
