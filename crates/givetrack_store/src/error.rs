//! Error types for store operations.

use crate::types::Collection;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The snapshot could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Another process holds the store lock.
    #[error("store at {0} is locked by another process")]
    Locked(PathBuf),

    /// The store cannot be reached (network, timeout, offline).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row is missing a field or carries the wrong type.
    #[error("invalid {collection} row: field `{field}` {reason}")]
    InvalidRow {
        /// Collection of the row.
        collection: Collection,
        /// Offending field.
        field: String,
        /// What was wrong.
        reason: &'static str,
    },

    /// The collection keeps no table stamp.
    #[error("collection {0} is not synchronized")]
    Unsynchronized(Collection),
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns true if the error is transient and the store may recover.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_classification() {
        assert!(StoreError::unavailable("offline").is_unavailable());
        assert!(!StoreError::Unsynchronized(Collection::SearchResult).is_unavailable());
        assert!(!StoreError::Codec("bad".into()).is_unavailable());
    }

    #[test]
    fn error_display() {
        let err = StoreError::InvalidRow {
            collection: Collection::Allocation,
            field: "percent".into(),
            reason: "is missing",
        };
        assert_eq!(err.to_string(), "invalid allocation row: field `percent` is missing");
    }
}
