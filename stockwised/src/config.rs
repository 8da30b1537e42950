//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use std::env;
use std::time::Duration;
use stockwise_exec::ExecConfig;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Ledger connection and settlement bounds
    pub ledger: LedgerConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Base URL of the HTTP ledger (unused in test environment)
    pub url: Option<String>,
    /// Per-call timeout for reads, conditional writes and health checks
    pub timeout_ms: u64,
    /// Timeout for a full catalog refresh
    pub refresh_timeout_ms: u64,
    /// Automatic retries after a write conflict (0 or 1)
    pub max_conflict_retries: u32,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (seeded in-memory ledger)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let ledger = Self::load_ledger_config()?;

        if environment != Environment::Test && ledger.url.is_none() {
            return Err(DaemonError::Config(format!(
                "STOCKWISE_LEDGER_URL is required in {} environment",
                environment
            )));
        }

        let config = Self {
            api,
            ledger,
            environment,
        };
        config.exec_config()?;

        Ok(config)
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            ledger: LedgerConfig {
                url: None,
                timeout_ms: 1_000,
                refresh_timeout_ms: 2_000,
                max_conflict_retries: 1,
            },
            environment: Environment::Test,
        }
    }

    /// Settlement bounds for sessions created by this daemon.
    pub fn exec_config(&self) -> DaemonResult<ExecConfig> {
        Ok(ExecConfig::new(
            Duration::from_millis(self.ledger.timeout_ms),
            Duration::from_millis(self.ledger.refresh_timeout_ms),
            self.ledger.max_conflict_retries,
        )?)
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("STOCKWISE_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid STOCKWISE_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("STOCKWISE_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("STOCKWISE_API_PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid STOCKWISE_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_ledger_config() -> DaemonResult<LedgerConfig> {
        let url = env::var("STOCKWISE_LEDGER_URL").ok().filter(|u| !u.trim().is_empty());

        Ok(LedgerConfig {
            url,
            timeout_ms: Self::load_u64_env("STOCKWISE_LEDGER_TIMEOUT_MS", 5_000)?,
            refresh_timeout_ms: Self::load_u64_env("STOCKWISE_REFRESH_TIMEOUT_MS", 10_000)?,
            max_conflict_retries: u32::try_from(Self::load_u64_env("STOCKWISE_MAX_CONFLICT_RETRIES", 1)?)
                .unwrap_or(u32::MAX),
        })
    }

    fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
        match env::var(key) {
            Ok(val) => val
                .trim()
                .parse::<u64>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            ledger: LedgerConfig {
                url: None,
                timeout_ms: 5_000,
                refresh_timeout_ms: 10_000,
                max_conflict_retries: 1,
            },
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.ledger.url.is_none());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.api.port, 0);
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_exec_config_defaults() {
        let exec = Config::default().exec_config().unwrap();

        assert_eq!(exec.ledger_timeout, Duration::from_secs(5));
        assert_eq!(exec.refresh_timeout, Duration::from_secs(10));
        assert_eq!(exec.max_conflict_retries, 1);
    }

    #[test]
    fn test_exec_config_rejects_retry_budget() {
        let mut config = Config::test();
        config.ledger.max_conflict_retries = 3;

        assert!(matches!(config.exec_config(), Err(DaemonError::Exec(_))));
    }

    #[test]
    fn test_load_u64_env() {
        env::set_var("STOCKWISE_TEST_ONLY_U64", "250");
        assert_eq!(Config::load_u64_env("STOCKWISE_TEST_ONLY_U64", 1).unwrap(), 250);

        env::set_var("STOCKWISE_TEST_ONLY_U64", "soon");
        assert!(Config::load_u64_env("STOCKWISE_TEST_ONLY_U64", 1).is_err());

        env::remove_var("STOCKWISE_TEST_ONLY_U64");
        assert_eq!(Config::load_u64_env("STOCKWISE_TEST_ONLY_U64", 7).unwrap(), 7);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
