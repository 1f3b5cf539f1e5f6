//! Service error types.

use givetrack_calibrator::CalibrateError;
use givetrack_store::{Collection, OwnerId, StoreError};
use givetrack_sync_engine::SyncError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur while handling an action.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Sync engine error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Calibration contract violation.
    #[error("calibration error: {0}")]
    Calibrate(#[from] CalibrateError),

    /// The owner has no local profile.
    #[error("no active profile for owner {0}")]
    NoActiveProfile(OwnerId),

    /// The action is not defined for the collection.
    #[error("{action} is not supported on {collection}")]
    Unsupported {
        /// Requested action.
        action: &'static str,
        /// Target collection.
        collection: Collection,
    },

    /// The worker queue is closed.
    #[error("worker queue closed")]
    WorkerClosed,
}

impl ServiceError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Sync(e) => e.is_retryable(),
            ServiceError::Store(e) => e.is_unavailable(),
            _ => false,
        }
    }
}
