//! Execution layer configuration.

use std::time::Duration;

use crate::error::{ExecError, ExecResult};

/// Bounds on ledger I/O and the conflict retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Timeout for each ledger read, conditional write and health check
    pub ledger_timeout: Duration,
    /// Timeout for a full catalog refresh
    pub refresh_timeout: Duration,
    /// Automatic retries after a write conflict (0 or 1)
    pub max_conflict_retries: u32,
}

impl ExecConfig {
    /// Create a config, checking the retry budget.
    pub fn new(
        ledger_timeout: Duration,
        refresh_timeout: Duration,
        max_conflict_retries: u32,
    ) -> ExecResult<Self> {
        if max_conflict_retries > 1 {
            return Err(ExecError::Config(format!(
                "max_conflict_retries must be 0 or 1, got {}",
                max_conflict_retries
            )));
        }
        if ledger_timeout.is_zero() || refresh_timeout.is_zero() {
            return Err(ExecError::Config("Timeouts must be non-zero".to_string()));
        }

        Ok(Self {
            ledger_timeout,
            refresh_timeout,
            max_conflict_retries,
        })
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            ledger_timeout: Duration::from_millis(5_000),
            refresh_timeout: Duration::from_millis(10_000),
            max_conflict_retries: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecConfig::default();
        assert_eq!(config.ledger_timeout, Duration::from_secs(5));
        assert_eq!(config.refresh_timeout, Duration::from_secs(10));
        assert_eq!(config.max_conflict_retries, 1);
    }

    #[test]
    fn test_retry_budget_is_capped() {
        let secs = Duration::from_secs(1);
        assert!(ExecConfig::new(secs, secs, 0).is_ok());
        assert!(ExecConfig::new(secs, secs, 1).is_ok());
        assert!(matches!(ExecConfig::new(secs, secs, 2), Err(ExecError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(ExecConfig::new(Duration::ZERO, Duration::from_secs(1), 1).is_err());
    }
}
