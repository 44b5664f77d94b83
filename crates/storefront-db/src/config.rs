//! Storefront database configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.
//!
//! | Variable                               | Default            |
//! |----------------------------------------|--------------------|
//! | `STOREFRONT_DATABASE_PATH`             | `./storefront.db`  |
//! | `STOREFRONT_DB_MAX_CONNECTIONS`        | `5`                |
//! | `STOREFRONT_DB_CONNECT_TIMEOUT_SECS`   | `30`               |
//! | `STOREFRONT_DB_BUSY_TIMEOUT_MS`        | `5000`             |
//! | `STOREFRONT_RUN_MIGRATIONS`            | `true`             |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pool::DbConfig;

/// Storefront configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub connect_timeout_secs: u64,

    /// Milliseconds a writer waits for the SQLite write lock
    pub busy_timeout_ms: u64,

    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: PathBuf::from("./storefront.db"),
            max_connections: 5,
            connect_timeout_secs: 30,
            busy_timeout_ms: 5000,
            run_migrations: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StoreConfig::default();

        let config = StoreConfig {
            database_path: lookup("STOREFRONT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(
                &lookup,
                "STOREFRONT_DB_MAX_CONNECTIONS",
                defaults.max_connections,
            )?,

            connect_timeout_secs: parse_or(
                &lookup,
                "STOREFRONT_DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,

            busy_timeout_ms: parse_or(
                &lookup,
                "STOREFRONT_DB_BUSY_TIMEOUT_MS",
                defaults.busy_timeout_ms,
            )?,

            run_migrations: parse_or(
                &lookup,
                "STOREFRONT_RUN_MIGRATIONS",
                defaults.run_migrations,
            )?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "STOREFRONT_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Pool settings for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .run_migrations(self.run_migrations)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("STOREFRONT_DATABASE_PATH", "/var/lib/storefront/shop.db"),
            ("STOREFRONT_DB_MAX_CONNECTIONS", "12"),
            ("STOREFRONT_RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/storefront/shop.db"));
        assert_eq!(config.max_connections, 12);
        assert!(!config.run_migrations);

        let db = config.db_config();
        assert_eq!(db.max_connections, 12);
        assert_eq!(db.busy_timeout, Duration::from_millis(5000));
        assert!(!db.run_migrations);
    }

    #[test]
    fn test_invalid_values() {
        let err = StoreConfig::from_lookup(lookup(&[("STOREFRONT_DB_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == "STOREFRONT_DB_MAX_CONNECTIONS"));

        assert!(StoreConfig::from_lookup(lookup(&[("STOREFRONT_DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[("STOREFRONT_RUN_MIGRATIONS", "yes")])).is_err());
    }
}
