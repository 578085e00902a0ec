//! PostgreSQL implementation of SettingsStore.
//!
//! Settings are name/value rows in `instance.config`. Missing or malformed
//! values fall back to the defaults the store was built with.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::{InstanceSettings, LoginLimits, SettingsStore};

const MAINTENANCE_MODE: &str = "maintenanceMode";
const LOGIN_ATTEMPTS: &str = "loginAttemptsPerWindow";
const LOGIN_WINDOW: &str = "loginWindowSecs";

#[derive(Clone)]
pub struct PostgresSettingsStore {
    pool: PgPool,
    defaults: InstanceSettings,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool, defaults: InstanceSettings) -> Self {
        Self { pool, defaults }
    }
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    async fn load(&self) -> Result<InstanceSettings, DomainError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, value FROM instance.config WHERE name = ANY($1)")
                .bind(vec![MAINTENANCE_MODE, LOGIN_ATTEMPTS, LOGIN_WINDOW])
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to load instance settings", e))?;

        Ok(settings_from_rows(rows.into_iter().collect(), &self.defaults))
    }
}

fn settings_from_rows(values: HashMap<String, String>, defaults: &InstanceSettings) -> InstanceSettings {
    fn parse<T: FromStr>(values: &HashMap<String, String>, name: &str, default: T) -> T {
        match values.get(name).map(|v| v.trim().parse::<T>()) {
            Some(Ok(value)) => value,
            Some(Err(_)) => {
                tracing::warn!(setting = name, "Invalid instance setting, using default");
                default
            }
            None => default,
        }
    }

    InstanceSettings {
        maintenance_mode: parse(&values, MAINTENANCE_MODE, defaults.maintenance_mode),
        login_limits: LoginLimits {
            attempts_per_window: parse(&values, LOGIN_ATTEMPTS, defaults.login_limits.attempts_per_window),
            window_secs: parse(&values, LOGIN_WINDOW, defaults.login_limits.window_secs),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn values_override_defaults() {
        let settings = settings_from_rows(
            rows(&[("maintenanceMode", "true"), ("loginAttemptsPerWindow", "3"), ("loginWindowSecs", "60")]),
            &InstanceSettings::default(),
        );

        assert!(settings.maintenance_mode);
        assert_eq!(settings.login_limits.attempts_per_window, 3);
        assert_eq!(settings.login_limits.window_secs, 60);
    }

    #[test]
    fn missing_values_use_defaults() {
        let settings = settings_from_rows(HashMap::new(), &InstanceSettings::default());
        assert_eq!(settings, InstanceSettings::default());
    }

    #[test]
    fn malformed_values_use_defaults() {
        let settings = settings_from_rows(
            rows(&[("maintenanceMode", "yes please"), ("loginAttemptsPerWindow", "-1")]),
            &InstanceSettings::default(),
        );
        assert_eq!(settings, InstanceSettings::default());
    }
}
