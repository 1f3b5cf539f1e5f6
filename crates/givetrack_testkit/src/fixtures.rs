//! Test fixtures for owners and their collections.

use givetrack_calibrator::Calibrator;
use givetrack_store::{
    Allocation, Collection, EntityStore, FileStore, HistoryEntry, MemoryStore, OwnerId, Profile,
    Record, SearchResult,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store, shareable with an engine.
    pub store: Arc<dyn EntityStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            _temp_dir: None,
        }
    }

    /// Creates a file-backed test store in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-backed, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns a shared handle to the store.
    pub fn shared(&self) -> Arc<dyn EntityStore> {
        Arc::clone(&self.store)
    }
}

impl std::ops::Deref for TestStore {
    type Target = dyn EntityStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

/// Returns an owner id.
pub fn owner(token: &str) -> OwnerId {
    OwnerId::new(token)
}

/// Returns an active profile with a giving pool of 100.
pub fn profile(owner: &OwnerId) -> Profile {
    let mut profile = Profile::new(owner.clone(), format!("{owner}@example.org"));
    profile.giving_pool = 100.0;
    profile
}

/// Returns allocations built from `(beneficiary_id, percent)` pairs.
pub fn allocations(owner: &OwnerId, shares: &[(&str, f64)]) -> Vec<Allocation> {
    shares
        .iter()
        .map(|(id, percent)| {
            Allocation::new(owner.clone(), *id, format!("Beneficiary {id}")).with_percent(*percent)
        })
        .collect()
}

/// Returns history entries built from `(time, beneficiary_id, amount)` triples.
pub fn history(owner: &OwnerId, entries: &[(i64, &str, f64)]) -> Vec<HistoryEntry> {
    entries
        .iter()
        .map(|(time, id, amount)| {
            HistoryEntry::new(owner.clone(), *time, *id, format!("Beneficiary {id}"), *amount)
        })
        .collect()
}

/// Returns search results for the given beneficiary ids.
pub fn search_results(owner: &OwnerId, ids: &[&str]) -> Vec<SearchResult> {
    ids.iter()
        .map(|id| SearchResult::new(owner.clone(), *id, format!("Beneficiary {id}")))
        .collect()
}

/// Writes entities straight into a store, bypassing any engine.
pub fn seed<T: Record>(store: &dyn EntityStore, entities: &[T]) {
    let rows: Vec<_> = entities.iter().map(T::to_row).collect();
    store
        .insert_or_replace(T::COLLECTION, &rows)
        .expect("Failed to seed store");
}

/// Writes a profile carrying the given table stamp for `collection`.
pub fn seed_stamped_profile(store: &dyn EntityStore, owner: &OwnerId, collection: Collection, stamp: i64) {
    let mut profile = profile(owner);
    profile.set_stamp(collection, stamp);
    seed(store, &[profile]);
}

/// Reads every entity of the owner from a store.
pub fn read_all<T: Record>(store: &dyn EntityStore, owner: &OwnerId) -> Vec<T> {
    store
        .query(T::COLLECTION, owner)
        .expect("Failed to query store")
        .iter()
        .map(|row| T::from_row(row).expect("Failed to decode row"))
        .collect()
}

/// Returns the percentages of `allocations` in order.
pub fn percents(allocations: &[Allocation]) -> Vec<f64> {
    allocations.iter().map(|a| a.percent).collect()
}

/// Asserts the allocations sum to 1 within the standard tolerance, or are empty.
pub fn assert_proportionate(allocations: &[Allocation]) {
    let percents = percents(allocations);
    assert!(
        Calibrator::default().is_proportionate(&percents),
        "allocations out of proportion: {percents:?}"
    );
}
