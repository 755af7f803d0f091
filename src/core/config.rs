//! Ledger engine configuration

use std::time::Duration;
use tracing::warn;

/// Runtime settings for the ledger engine
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// Longest time an operation waits for all of its account locks before failing with `Busy`
    pub lock_timeout: Duration,
    /// Capacity of the notification queue; events beyond it are dropped
    pub notification_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            notification_capacity: 1024,
        }
    }
}

impl LedgerConfig {
    /// Create a LedgerConfig with custom values
    ///
    /// Zero values are invalid and fall back to the defaults with a warning.
    pub fn new(lock_timeout: Duration, notification_capacity: usize) -> Self {
        let default = Self::default();

        let lock_timeout = if lock_timeout.is_zero() {
            warn!(
                default_ms = u64::try_from(default.lock_timeout.as_millis()).unwrap_or(u64::MAX),
                "invalid lock timeout (0 ms), using default"
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        let notification_capacity = if notification_capacity == 0 {
            warn!(
                default = default.notification_capacity,
                "invalid notification capacity (0), using default"
            );
            default.notification_capacity
        } else {
            notification_capacity
        };

        Self {
            lock_timeout,
            notification_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let config = LedgerConfig::new(Duration::ZERO, 0);
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_custom_values_are_kept() {
        let config = LedgerConfig::new(Duration::from_millis(50), 8);
        assert_eq!(config.lock_timeout, Duration::from_millis(50));
        assert_eq!(config.notification_capacity, 8);
    }
}
