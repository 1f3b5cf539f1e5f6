//! Bounded reads against the remote store.

use givetrack_store::StoreResult;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Outcome of a bounded remote read.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteRead<T> {
    /// The read finished in time.
    Ready(T),
    /// The read did not finish before the deadline.
    TimedOut,
    /// The read failed.
    Failed(String),
}

impl<T> RemoteRead<T> {
    /// Returns true if the read finished in time.
    pub fn is_ready(&self) -> bool {
        matches!(self, RemoteRead::Ready(_))
    }

    /// Returns the value if the read finished in time.
    pub fn ready(self) -> Option<T> {
        match self {
            RemoteRead::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value, or `default` on timeout or failure.
    pub fn unwrap_or_else(self, default: impl FnOnce() -> T) -> T {
        self.ready().unwrap_or_else(default)
    }

    /// Maps the value of a finished read.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteRead<U> {
        match self {
            RemoteRead::Ready(value) => RemoteRead::Ready(f(value)),
            RemoteRead::TimedOut => RemoteRead::TimedOut,
            RemoteRead::Failed(reason) => RemoteRead::Failed(reason),
        }
    }

    /// Returns a short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            RemoteRead::Ready(_) => "ready",
            RemoteRead::TimedOut => "timed_out",
            RemoteRead::Failed(_) => "failed",
        }
    }
}

/// Runs `read` on a helper thread and waits at most `timeout` for it.
///
/// A read that misses the deadline keeps running detached; its result is
/// dropped when it arrives.
pub fn bounded_read<T, F>(timeout: Duration, read: F) -> RemoteRead<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let spawned = thread::Builder::new()
        .name("givetrack-remote-read".into())
        .spawn(move || {
            let _ = tx.send(read());
        });
    if let Err(e) = spawned {
        return RemoteRead::Failed(e.to_string());
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(value)) => RemoteRead::Ready(value),
        Ok(Err(e)) => RemoteRead::Failed(e.to_string()),
        Err(RecvTimeoutError::Timeout) => RemoteRead::TimedOut,
        Err(RecvTimeoutError::Disconnected) => RemoteRead::Failed("remote read aborted".into()),
    }
}
