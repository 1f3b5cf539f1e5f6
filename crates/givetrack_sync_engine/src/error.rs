//! Error types for the sync engine.

use givetrack_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Remote failures during mirrored writes are absorbed by the engine and
/// never surface here; only the device store and explicit remote-only calls
/// produce errors.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The device store failed.
    #[error("local store error: {0}")]
    Local(#[from] StoreError),

    /// The cloud store could not be reached.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A bounded remote read did not finish in time.
    #[error("remote read timed out")]
    TimedOut,

    /// The collection does not take part in this operation.
    #[error("collection {0} is not synchronized")]
    Unsynchronized(givetrack_store::Collection),
}

impl SyncError {
    /// Returns true if a later pass may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Local(e) => e.is_unavailable(),
            SyncError::RemoteUnavailable(_) | SyncError::TimedOut => true,
            SyncError::Unsynchronized(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use givetrack_store::Collection;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::TimedOut.is_retryable());
        assert!(SyncError::RemoteUnavailable("offline".into()).is_retryable());
        assert!(!SyncError::Unsynchronized(Collection::SearchResult).is_retryable());
        assert!(!SyncError::Local(StoreError::Codec("bad".into())).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(SyncError::TimedOut.to_string(), "remote read timed out");
        let err = SyncError::Unsynchronized(Collection::SearchResult);
        assert!(err.to_string().contains("search_result"));
    }
}
