//! Sync engine over the device and cloud stores.

use crate::clock::StampClock;
use crate::config::SyncConfig;
use crate::decision::{decide, Direction, ReconcileStatus, Reconciliation};
use crate::error::{SyncError, SyncResult};
use crate::remote::{bounded_read, RemoteRead};
use givetrack_store::{
    Collection, EntityStore, Filter, OwnerId, Profile, Record, Row, SearchResult, StoreResult,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// Stamp fields a Profile row carries for the other synchronized collections.
const COLLECTION_STAMPS: [Collection; 2] = [Collection::Allocation, Collection::History];

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Reconciliations that pulled remote rows.
    pub pulls: u64,
    /// Reconciliations that pushed local rows.
    pub pushes: u64,
    /// Reconciliations that changed nothing.
    pub noops: u64,
    /// Reconciliations that could not reach the remote store.
    pub degraded: u64,
    /// Mirrored writes issued.
    pub mirrored_writes: u64,
    /// Remote writes that failed and were left for a later pass.
    pub remote_failures: u64,
    /// Last reconciliation time.
    pub last_reconciled: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Keeps the device store and the cloud store of each owner in step.
///
/// Every synchronized collection has a table stamp on the owner's Profile
/// row in each store. [`SyncEngine::reconcile`] compares the two stamps and
/// copies the whole collection from the newer side. Writes go through
/// [`SyncEngine::put`], [`SyncEngine::remove`] and [`SyncEngine::clear`],
/// which apply to both stores and stamp both with one fresh stamp.
///
/// The local store is authoritative for errors: a failed local write is
/// returned, a failed remote write is logged, counted and left for the next
/// reconciliation.
pub struct SyncEngine {
    config: SyncConfig,
    local: Arc<dyn EntityStore>,
    remote: Arc<dyn EntityStore>,
    clock: StampClock,
    stats: RwLock<SyncStats>,
}

impl SyncEngine {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, local: Arc<dyn EntityStore>, remote: Arc<dyn EntityStore>) -> Self {
        Self {
            config,
            local,
            remote,
            clock: StampClock::new(),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Replaces the stamp clock.
    #[must_use]
    pub fn with_clock(mut self, clock: StampClock) -> Self {
        self.clock = clock;
        self
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the device store.
    pub fn local(&self) -> &dyn EntityStore {
        self.local.as_ref()
    }

    /// Gets the cloud store.
    pub fn remote(&self) -> &dyn EntityStore {
        self.remote.as_ref()
    }

    /// Gets the stamp clock.
    pub fn clock(&self) -> &StampClock {
        &self.clock
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Reads the owner's local profile, if any.
    pub fn local_profile(&self, owner: &OwnerId) -> SyncResult<Option<Profile>> {
        Ok(self
            .local
            .query(Collection::Profile, owner)?
            .first()
            .map(Profile::from_row)
            .transpose()?)
    }

    /// Reads the owner's remote profile within the configured timeout.
    pub fn read_remote_profile(&self, owner: &OwnerId) -> RemoteRead<Option<Profile>> {
        let remote = Arc::clone(&self.remote);
        let owner = owner.clone();
        bounded_read(self.config.remote_read_timeout, move || {
            remote
                .query(Collection::Profile, &owner)?
                .first()
                .map(Profile::from_row)
                .transpose()
        })
    }

    /// Reads the owner's remote profile, defaulting to an inactive profile
    /// with zero stamps when it is missing, slow or unreadable.
    pub fn fetch_remote_profile(&self, owner: &OwnerId) -> Profile {
        match self.read_remote_profile(owner) {
            RemoteRead::Ready(Some(profile)) => profile,
            RemoteRead::Ready(None) => Profile::inactive_default(owner.clone()),
            other => {
                tracing::warn!(owner = %owner, outcome = other.label(), "remote profile unavailable, using default");
                Profile::inactive_default(owner.clone())
            }
        }
    }

    fn read_remote_rows(&self, collection: Collection, owner: &OwnerId) -> RemoteRead<Vec<Row>> {
        let remote = Arc::clone(&self.remote);
        let owner = owner.clone();
        bounded_read(self.config.remote_read_timeout, move || remote.query(collection, &owner))
    }

    /// Reconciles one synchronized collection of `owner`.
    ///
    /// When the remote profile cannot be read in time the pass is degraded:
    /// nothing is changed and the result says so.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is not synchronized or the local
    /// store fails.
    pub fn reconcile(&self, owner: &OwnerId, collection: Collection) -> SyncResult<Reconciliation> {
        if !collection.is_synchronized() {
            return Err(SyncError::Unsynchronized(collection));
        }

        let local_stamp = self.local.read_table_stamp(owner, collection)?;
        let remote_profile = match self.read_remote_profile(owner) {
            RemoteRead::Ready(profile) => profile,
            RemoteRead::TimedOut => {
                return Ok(self.degrade(owner, collection, local_stamp, SyncError::TimedOut.to_string()));
            }
            RemoteRead::Failed(reason) => {
                return Ok(self.degrade(owner, collection, local_stamp, reason));
            }
        };
        let remote_stamp = remote_profile.as_ref().map_or(0, |p| p.stamp(collection));
        self.clock.observe(local_stamp);
        self.clock.observe(remote_stamp);

        let direction = decide(collection, local_stamp, remote_stamp);
        tracing::debug!(
            owner = %owner,
            collection = %collection,
            local_stamp,
            remote_stamp,
            direction = %direction,
            "reconciling"
        );

        let mut result = Reconciliation {
            collection,
            direction,
            local_stamp,
            remote_stamp,
            rows: 0,
            status: ReconcileStatus::Applied,
        };

        match direction {
            Direction::PullRemote => self.pull(owner, remote_stamp, &mut result)?,
            Direction::PushLocal => self.push(owner, local_stamp, remote_profile.as_ref(), &mut result)?,
            Direction::NoOp => {}
        }

        let mut stats = self.stats.write();
        match (&result.status, direction) {
            (ReconcileStatus::Degraded(reason), _) => {
                stats.degraded += 1;
                stats.last_error = Some(reason.clone());
            }
            (_, Direction::PullRemote) => stats.pulls += 1,
            (_, Direction::PushLocal) => stats.pushes += 1,
            (_, Direction::NoOp) => stats.noops += 1,
        }
        stats.last_reconciled = Some(Instant::now());

        Ok(result)
    }

    /// Reconciles every synchronized collection, Profile first.
    pub fn reconcile_all(&self, owner: &OwnerId) -> SyncResult<Vec<Reconciliation>> {
        Collection::SYNCHRONIZED
            .iter()
            .map(|collection| self.reconcile(owner, *collection))
            .collect()
    }

    fn degrade(
        &self,
        owner: &OwnerId,
        collection: Collection,
        local_stamp: i64,
        reason: String,
    ) -> Reconciliation {
        tracing::warn!(owner = %owner, collection = %collection, reason = %reason, "remote unreadable, reconciliation degraded");
        let mut stats = self.stats.write();
        stats.degraded += 1;
        stats.last_error = Some(reason.clone());
        stats.last_reconciled = Some(Instant::now());
        Reconciliation::degraded(collection, local_stamp, reason)
    }

    fn pull(&self, owner: &OwnerId, remote_stamp: i64, result: &mut Reconciliation) -> SyncResult<()> {
        let collection = result.collection;
        let mut rows = match self.read_remote_rows(collection, owner) {
            RemoteRead::Ready(rows) => rows,
            other => {
                let reason = match other {
                    RemoteRead::Failed(reason) => reason,
                    _ => SyncError::TimedOut.to_string(),
                };
                tracing::warn!(owner = %owner, collection = %collection, reason = %reason, "remote rows unreadable, pull skipped");
                result.status = ReconcileStatus::Degraded(reason);
                return Ok(());
            }
        };
        result.rows = rows.len();

        if collection == Collection::Profile {
            for row in &mut rows {
                row.set("active", true);
            }
            if let Err(e) = self.remote.insert_or_replace(Collection::Profile, &rows) {
                self.absorb("activate remote profile", &e);
            }
            for row in &mut rows {
                for stamped in COLLECTION_STAMPS {
                    if let Some(field) = stamped.stamp_field() {
                        row.set(field, 0_i64);
                    }
                }
            }
            self.local.replace_all(Collection::Profile, owner, &rows)?;
        } else {
            self.local.replace_all(collection, owner, &rows)?;
            self.local.write_table_stamp(owner, collection, remote_stamp)?;
        }

        tracing::info!(owner = %owner, collection = %collection, rows = rows.len(), stamp = remote_stamp, "pulled remote rows");
        Ok(())
    }

    fn push(
        &self,
        owner: &OwnerId,
        local_stamp: i64,
        remote_profile: Option<&Profile>,
        result: &mut Reconciliation,
    ) -> SyncResult<()> {
        let collection = result.collection;
        let mut rows = self.local.query(collection, owner)?;
        result.rows = rows.len();

        let pushed = if collection == Collection::Profile {
            let Some(mut row) = rows.pop() else {
                return Ok(());
            };
            row.set("active", true);
            self.local.insert_or_replace(Collection::Profile, std::slice::from_ref(&row))?;
            if let Some(remote) = remote_profile {
                for stamped in COLLECTION_STAMPS {
                    if let Some(field) = stamped.stamp_field() {
                        row.set(field, remote.stamp(stamped));
                    }
                }
            }
            self.remote.replace_all(Collection::Profile, owner, &[row])
        } else {
            self.remote
                .replace_all(collection, owner, &rows)
                .and_then(|()| self.remote.write_table_stamp(owner, collection, local_stamp).map(|_| ()))
        };

        if let Err(e) = pushed {
            self.absorb("push", &e);
            result.status = ReconcileStatus::Degraded(e.to_string());
            return Ok(());
        }

        tracing::info!(owner = %owner, collection = %collection, rows = result.rows, stamp = local_stamp, "pushed local rows");
        Ok(())
    }

    /// Inserts or replaces entities in both stores under one fresh stamp.
    ///
    /// Returns the stamp written, or `None` when nothing was written.
    /// SearchResult rows only go to the local store and are not stamped.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store fails.
    pub fn put<T: Record>(&self, owner: &OwnerId, entities: &[T]) -> SyncResult<Option<i64>> {
        if entities.is_empty() {
            return Ok(None);
        }
        let rows: Vec<Row> = entities.iter().map(T::to_row).collect();
        let collection = T::COLLECTION;
        if !collection.is_synchronized() {
            self.local.insert_or_replace(collection, &rows)?;
            return Ok(None);
        }

        let stamp = self.mint(owner, collection)?;
        if collection == Collection::Profile {
            let local_rows = restamp_profiles(self.local.as_ref(), owner, &rows, stamp)?;
            self.local.insert_or_replace(collection, &local_rows)?;
            let mirrored = restamp_profiles(self.remote.as_ref(), owner, &rows, stamp)
                .and_then(|remote_rows| self.remote.insert_or_replace(collection, &remote_rows));
            self.mirrored("put", mirrored);
        } else {
            self.local.insert_or_replace(collection, &rows)?;
            self.local.write_table_stamp(owner, collection, stamp)?;
            let mirrored = self
                .remote
                .insert_or_replace(collection, &rows)
                .and_then(|()| self.remote.write_table_stamp(owner, collection, stamp).map(|_| ()));
            self.mirrored("put", mirrored);
        }

        tracing::debug!(owner = %owner, collection = %collection, rows = rows.len(), stamp, "mirrored put");
        Ok(Some(stamp))
    }

    /// Deletes entities from both stores.
    ///
    /// Returns the number of local rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store fails.
    pub fn remove<T: Record>(&self, owner: &OwnerId, entities: &[T]) -> SyncResult<usize> {
        if entities.is_empty() {
            return Ok(0);
        }
        let filter = Filter::Keys(entities.iter().map(T::key).collect());
        self.delete(owner, T::COLLECTION, &filter)
    }

    /// Deletes every row of `collection` from both stores.
    ///
    /// Returns the number of local rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store fails.
    pub fn clear(&self, owner: &OwnerId, collection: Collection) -> SyncResult<usize> {
        self.delete(owner, collection, &Filter::All)
    }

    fn delete(&self, owner: &OwnerId, collection: Collection, filter: &Filter) -> SyncResult<usize> {
        if !collection.is_synchronized() {
            return Ok(self.local.delete_matching(collection, owner, filter)?);
        }

        // Deleting the profile removes the stamps with it; nothing is restamped.
        if collection == Collection::Profile {
            let removed = self.local.delete_matching(collection, owner, filter)?;
            let mirrored = self.remote.delete_matching(collection, owner, filter).map(|_| ());
            self.mirrored("delete", mirrored);
            tracing::debug!(owner = %owner, removed, "deleted profile");
            return Ok(removed);
        }

        let stamp = self.mint(owner, collection)?;
        let removed = self.local.delete_matching(collection, owner, filter)?;
        self.local.write_table_stamp(owner, collection, stamp)?;
        let mirrored = self
            .remote
            .delete_matching(collection, owner, filter)
            .and_then(|_| self.remote.write_table_stamp(owner, collection, stamp).map(|_| ()));
        self.mirrored("delete", mirrored);

        tracing::debug!(owner = %owner, collection = %collection, removed, stamp, "mirrored delete");
        Ok(removed)
    }

    /// Replaces the owner's local search results.
    pub fn replace_search_results(&self, owner: &OwnerId, results: &[SearchResult]) -> SyncResult<()> {
        let rows: Vec<Row> = results.iter().map(SearchResult::to_row).collect();
        self.local.replace_all(Collection::SearchResult, owner, &rows)?;
        tracing::debug!(owner = %owner, results = rows.len(), "replaced search results");
        Ok(())
    }

    fn mint(&self, owner: &OwnerId, collection: Collection) -> SyncResult<i64> {
        self.clock.observe(self.local.read_table_stamp(owner, collection)?);
        Ok(self.clock.next())
    }

    fn mirrored(&self, op: &'static str, result: StoreResult<()>) {
        self.stats.write().mirrored_writes += 1;
        if let Err(e) = result {
            self.absorb(op, &e);
        }
    }

    fn absorb(&self, op: &'static str, error: &givetrack_store::StoreError) {
        tracing::warn!(op, error = %error, "remote write failed, left for next reconciliation");
        let mut stats = self.stats.write();
        stats.remote_failures += 1;
        stats.last_error = Some(error.to_string());
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Sets the profile stamp on `rows` and carries over the collection stamps
/// already held by `store`, so a profile write never moves another
/// collection's stamp.
fn restamp_profiles(
    store: &dyn EntityStore,
    owner: &OwnerId,
    rows: &[Row],
    stamp: i64,
) -> StoreResult<Vec<Row>> {
    let existing = store.query(Collection::Profile, owner)?.into_iter().next();
    Ok(rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for collection in COLLECTION_STAMPS {
                let Some(field) = collection.stamp_field() else {
                    continue;
                };
                let kept = existing
                    .as_ref()
                    .and_then(|prev| prev.get(field).cloned())
                    .unwrap_or_else(|| 0_i64.into());
                row.set(field, kept);
            }
            if let Some(field) = Collection::Profile.stamp_field() {
                row.set(field, stamp);
            }
            row
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use givetrack_store::{Allocation, HistoryEntry, MemoryStore};

    struct Fixture {
        local: Arc<MemoryStore>,
        remote: Arc<MemoryStore>,
        engine: SyncEngine,
        owner: OwnerId,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(SyncConfig::default(), local.clone(), remote.clone())
            .with_clock(StampClock::with_source(Arc::new(|| 1_000)));
        let owner = OwnerId::new("u1");
        let profile = Profile::new(owner.clone(), "a@b.c").to_row();
        local.insert_or_replace(Collection::Profile, &[profile.clone()]).unwrap();
        remote.insert_or_replace(Collection::Profile, &[profile]).unwrap();
        Fixture {
            local,
            remote,
            engine,
            owner,
        }
    }

    fn allocation(owner: &OwnerId, id: &str, percent: f64) -> Allocation {
        Allocation::new(owner.clone(), id, id).with_percent(percent)
    }

    #[test]
    fn put_stamps_both_stores() {
        let f = fixture();
        let stamp = f
            .engine
            .put(&f.owner, &[allocation(&f.owner, "b1", 1.0)])
            .unwrap()
            .unwrap();

        for store in [f.local.as_ref(), f.remote.as_ref()] {
            assert_eq!(store.read_table_stamp(&f.owner, Collection::Allocation).unwrap(), stamp);
            assert_eq!(store.query(Collection::Allocation, &f.owner).unwrap().len(), 1);
        }
        assert_eq!(f.engine.stats().mirrored_writes, 1);
    }

    #[test]
    fn successive_writes_get_increasing_stamps() {
        let f = fixture();
        let a = f.engine.put(&f.owner, &[allocation(&f.owner, "b1", 1.0)]).unwrap().unwrap();
        let b = f
            .engine
            .put(&f.owner, &[HistoryEntry::new(f.owner.clone(), 1, "b1", "b1", 5.0)])
            .unwrap()
            .unwrap();
        assert!(b > a);
    }

    #[test]
    fn profile_put_keeps_collection_stamps() {
        let f = fixture();
        f.local.write_table_stamp(&f.owner, Collection::Allocation, 300).unwrap();
        f.remote.write_table_stamp(&f.owner, Collection::Allocation, 400).unwrap();

        let mut profile = f.engine.local_profile(&f.owner).unwrap().unwrap();
        profile.giving_pool = 50.0;
        let stamp = f.engine.put(&f.owner, &[profile]).unwrap().unwrap();

        assert_eq!(f.local.read_table_stamp(&f.owner, Collection::Allocation).unwrap(), 300);
        assert_eq!(f.remote.read_table_stamp(&f.owner, Collection::Allocation).unwrap(), 400);
        assert_eq!(f.remote.read_table_stamp(&f.owner, Collection::Profile).unwrap(), stamp);
        assert_eq!(f.engine.fetch_remote_profile(&f.owner).giving_pool, 50.0);
    }

    #[test]
    fn search_results_stay_local() {
        let f = fixture();
        let results = vec![SearchResult::new(f.owner.clone(), "b1", "Food Bank")];
        f.engine.replace_search_results(&f.owner, &results).unwrap();
        assert_eq!(f.local.len(Collection::SearchResult), 1);
        assert_eq!(f.remote.len(Collection::SearchResult), 0);

        f.engine.replace_search_results(&f.owner, &[]).unwrap();
        assert_eq!(f.local.len(Collection::SearchResult), 0);
    }

    #[test]
    fn search_results_are_not_reconciled() {
        let f = fixture();
        assert!(matches!(
            f.engine.reconcile(&f.owner, Collection::SearchResult),
            Err(SyncError::Unsynchronized(Collection::SearchResult))
        ));
    }

    #[test]
    fn remove_and_clear_restamp() {
        let f = fixture();
        let a = allocation(&f.owner, "b1", 0.5);
        let b = allocation(&f.owner, "b2", 0.5);
        let first = f.engine.put(&f.owner, &[a.clone(), b]).unwrap().unwrap();

        assert_eq!(f.engine.remove(&f.owner, &[a]).unwrap(), 1);
        let after_remove = f.remote.read_table_stamp(&f.owner, Collection::Allocation).unwrap();
        assert!(after_remove > first);
        assert_eq!(f.remote.len(Collection::Allocation), 1);

        assert_eq!(f.engine.clear(&f.owner, Collection::Allocation).unwrap(), 1);
        assert!(f.local.read_table_stamp(&f.owner, Collection::Allocation).unwrap() > after_remove);
        assert_eq!(f.remote.len(Collection::Allocation), 0);
    }

    #[test]
    fn missing_remote_profile_defaults_inactive() {
        let f = fixture();
        let stranger = OwnerId::new("nobody");
        let profile = f.engine.fetch_remote_profile(&stranger);
        assert!(!profile.active);
        assert_eq!(profile.owner, stranger);
    }
}
