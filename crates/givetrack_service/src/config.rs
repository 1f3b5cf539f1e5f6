//! Service configuration.

use givetrack_sync_engine::SyncConfig;
use std::time::Duration;

/// Default time an owner's worker may sit idle before it is stopped.
pub const DEFAULT_WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for the action handlers and their work queues.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Sync engine configuration.
    pub sync: SyncConfig,
    /// Pending requests buffered per owner before senders wait.
    pub queue_capacity: usize,
    /// Smallest giving pool per allocation kept when a beneficiary is added.
    pub min_pool_per_beneficiary: f64,
    /// Idle time after which an owner's worker stops; the next request
    /// starts a new one.
    pub worker_idle_timeout: Duration,
}

impl ServiceConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            sync: SyncConfig::default(),
            queue_capacity: 64,
            min_pool_per_beneficiary: 0.30,
            worker_idle_timeout: DEFAULT_WORKER_IDLE_TIMEOUT,
        }
    }

    /// Sets the sync configuration.
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Sets the per-owner queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Sets the minimum giving pool per beneficiary.
    pub fn with_min_pool_per_beneficiary(mut self, amount: f64) -> Self {
        self.min_pool_per_beneficiary = amount;
        self
    }

    /// Sets the worker idle timeout.
    pub fn with_worker_idle_timeout(mut self, timeout: Duration) -> Self {
        self.worker_idle_timeout = timeout;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}
