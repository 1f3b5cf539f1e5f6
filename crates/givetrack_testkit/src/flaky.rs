//! A store stand-in for the cloud side.

use givetrack_store::{
    Collection, EntityStore, Filter, MemoryStore, OwnerId, Row, StoreError, StoreResult,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// An in-memory store whose availability and latency can be changed at
/// runtime.
///
/// While offline every call fails with `StoreError::Unavailable`. Latency is
/// applied before every call, online or not.
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    online: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicU64,
}

impl FlakyStore {
    /// Creates an online store with no latency.
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            online: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        }
    }

    /// Sets whether calls succeed.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Returns true if calls succeed.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Sets the delay applied before every call.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Returns the number of calls made, including failed ones.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store, bypassing availability and latency.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn gate(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            thread::sleep(Duration::from_millis(latency));
        }
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::unavailable("remote store offline"))
        }
    }
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for FlakyStore {
    fn query(&self, collection: Collection, owner: &OwnerId) -> StoreResult<Vec<Row>> {
        self.gate()?;
        self.inner.query(collection, owner)
    }

    fn insert_or_replace(&self, collection: Collection, rows: &[Row]) -> StoreResult<()> {
        self.gate()?;
        self.inner.insert_or_replace(collection, rows)
    }

    fn delete_matching(
        &self,
        collection: Collection,
        owner: &OwnerId,
        filter: &Filter,
    ) -> StoreResult<usize> {
        self.gate()?;
        self.inner.delete_matching(collection, owner, filter)
    }

    fn replace_all(&self, collection: Collection, owner: &OwnerId, rows: &[Row]) -> StoreResult<()> {
        self.gate()?;
        self.inner.replace_all(collection, owner, rows)
    }
}
