//! Configuration for the sync engine.

use std::time::Duration;

/// Default bound on synchronous remote reads.
pub const DEFAULT_REMOTE_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bound on synchronous remote reads; a slower read yields a default.
    pub remote_read_timeout: Duration,
    /// Decimal places of tolerance for allocation sums.
    pub precision: u32,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            remote_read_timeout: DEFAULT_REMOTE_READ_TIMEOUT,
            precision: 4,
        }
    }

    /// Sets the remote read timeout.
    pub fn with_remote_read_timeout(mut self, timeout: Duration) -> Self {
        self.remote_read_timeout = timeout;
        self
    }

    /// Sets the calibration precision.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_remote_read_timeout(Duration::from_millis(250))
            .with_precision(6);

        assert_eq!(config.remote_read_timeout, Duration::from_millis(250));
        assert_eq!(config.precision, 6);
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.remote_read_timeout, Duration::from_secs(2));
        assert_eq!(config.precision, 4);
    }
}
