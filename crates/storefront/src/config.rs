//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TORODO_DATA_DIR` - Directory holding the stored values (default: ./data)
//! - `TORODO_SAVE_RETRIES` - Retries after a failed save (default: 3)
//! - `TORODO_SAVE_BACKOFF_MS` - Delay before the first retry, doubled on each
//!   further retry (default: 200)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (e.g. production)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::container::PersistPolicy;

const DEFAULT_DATA_DIR: &str = "./data";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct TorodoConfig {
    /// Directory of the file-backed store
    pub data_dir: PathBuf,
    /// Retry policy for background saves
    pub persist: PersistPolicy,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Project DSN (contains the ingest key)
    pub dsn: Option<SecretString>,
    /// Environment tag attached to events
    pub environment: Option<String>,
}

impl TorodoConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let data_dir = PathBuf::from(env.or_default("TORODO_DATA_DIR", DEFAULT_DATA_DIR));
        let max_retries =
            env.parsed_or("TORODO_SAVE_RETRIES", PersistPolicy::DEFAULT_MAX_RETRIES)?;
        let backoff_ms = env.parsed_or(
            "TORODO_SAVE_BACKOFF_MS",
            u64::try_from(PersistPolicy::DEFAULT_BASE_DELAY.as_millis()).unwrap_or(u64::MAX),
        )?;

        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN").map(SecretString::from),
            environment: env.optional("SENTRY_ENVIRONMENT"),
        };

        Ok(Self {
            data_dir,
            persist: PersistPolicy {
                max_retries,
                base_delay: Duration::from_millis(backoff_ms),
            },
            sentry,
        })
    }
}

impl Default for TorodoConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            persist: PersistPolicy::default(),
            sentry: SentryConfig::default(),
        }
    }
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<TorodoConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        TorodoConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.persist, PersistPolicy::default());
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TORODO_DATA_DIR", "/var/lib/torodo"),
            ("TORODO_SAVE_RETRIES", "5"),
            ("TORODO_SAVE_BACKOFF_MS", "50"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/torodo"));
        assert_eq!(config.persist.max_retries, 5);
        assert_eq!(config.persist.base_delay, Duration::from_millis(50));
        assert_eq!(
            config.sentry.dsn.unwrap().expose_secret(),
            "https://key@sentry.example/1"
        );
        assert_eq!(config.sentry.environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("TORODO_SAVE_RETRIES", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "TORODO_SAVE_RETRIES"));
    }

    #[test]
    fn test_blank_is_unset() {
        let config = load(&[("TORODO_DATA_DIR", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_debug_redacts_dsn() {
        let config = load(&[("SENTRY_DSN", "https://key@sentry.example/1")]).unwrap();
        assert!(!format!("{config:?}").contains("key@"));
    }
}
