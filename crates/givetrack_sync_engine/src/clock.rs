//! Table stamp clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in epoch milliseconds.
pub type TimeSource = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Returns the system time in epoch milliseconds.
#[must_use]
pub fn system_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Issues table stamps.
///
/// Stamps are epoch milliseconds, strictly increasing within one clock even
/// when two writes land in the same millisecond or the wall clock steps
/// back. [`StampClock::observe`] folds in stamps seen from other stores so a
/// later local write never loses to a remote stamp it has already seen.
pub struct StampClock {
    source: TimeSource,
    last: AtomicI64,
}

impl StampClock {
    /// Creates a clock over the system time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(Arc::new(system_millis))
    }

    /// Creates a clock over a custom time source.
    #[must_use]
    pub fn with_source(source: TimeSource) -> Self {
        Self {
            source,
            last: AtomicI64::new(0),
        }
    }

    /// Returns the current wall-clock time without issuing a stamp.
    #[must_use]
    pub fn now(&self) -> i64 {
        (self.source)()
    }

    /// Issues the next stamp.
    pub fn next(&self) -> i64 {
        let now = self.now();
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }

    /// Records a stamp issued elsewhere.
    pub fn observe(&self, stamp: i64) {
        self.last.fetch_max(stamp, Ordering::SeqCst);
    }

    /// Returns the last issued or observed stamp.
    #[must_use]
    pub fn last(&self) -> i64 {
        self.last.load(Ordering::SeqCst)
    }
}

impl Default for StampClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StampClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampClock").field("last", &self.last()).finish()
    }
}
