//! Domain actions over the sync engine and the calibrator.

use crate::collaborators::{
    ContactLookup, Directory, EmptyDirectory, NoContacts, RefreshNotifier, SilentNotifier,
};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use givetrack_calibrator::Calibrator;
use givetrack_store::{
    Allocation, Collection, HistoryEntry, OwnerId, Profile, ScheduleMode, SearchResult, Table,
};
use givetrack_sync_engine::SyncEngine;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Entities carried by a request, tagged by collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Entities {
    /// Profiles.
    Profile(Vec<Profile>),
    /// Allocations.
    Allocation(Vec<Allocation>),
    /// History entries.
    History(Vec<HistoryEntry>),
    /// Search results.
    SearchResult(Vec<SearchResult>),
}

impl Entities {
    /// Returns the collection the entities belong to.
    pub fn collection(&self) -> Collection {
        match self {
            Entities::Profile(_) => Collection::Profile,
            Entities::Allocation(_) => Collection::Allocation,
            Entities::History(_) => Collection::History,
            Entities::SearchResult(_) => Collection::SearchResult,
        }
    }

    /// Returns the number of entities.
    pub fn len(&self) -> usize {
        match self {
            Entities::Profile(v) => v.len(),
            Entities::Allocation(v) => v.len(),
            Entities::History(v) => v.len(),
            Entities::SearchResult(v) => v.len(),
        }
    }

    /// Returns true if there are no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy with every entity assigned to `owner`.
    ///
    /// Rows are always namespaced by the requesting owner, whatever owner the
    /// caller put on them.
    pub fn owned_by(&self, owner: &OwnerId) -> Entities {
        fn claim<T: Clone>(items: &[T], owner: &OwnerId, assign: impl Fn(&mut T, OwnerId)) -> Vec<T> {
            items
                .iter()
                .cloned()
                .map(|mut item| {
                    assign(&mut item, owner.clone());
                    item
                })
                .collect()
        }
        match self {
            Entities::Profile(v) => Entities::Profile(claim(v, owner, |p, o| p.owner = o)),
            Entities::Allocation(v) => Entities::Allocation(claim(v, owner, |a, o| a.owner = o)),
            Entities::History(v) => Entities::History(claim(v, owner, |h, o| h.owner = o)),
            Entities::SearchResult(v) => Entities::SearchResult(claim(v, owner, |r, o| r.owner = o)),
        }
    }
}

/// An action on one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Reconcile the collection, or run a directory search for SearchResult.
    Fetch(Collection),
    /// Add or update entities.
    Add(Entities),
    /// Remove entities.
    Remove(Entities),
    /// Commit a transaction batch over allocations.
    Commit(Entities),
    /// Remove everything in the collection.
    Reset(Collection),
}

impl Action {
    /// Returns the target collection.
    pub fn collection(&self) -> Collection {
        match self {
            Action::Fetch(c) | Action::Reset(c) => *c,
            Action::Add(e) | Action::Remove(e) | Action::Commit(e) => e.collection(),
        }
    }

    /// Returns the action name.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Fetch(_) => "fetch",
            Action::Add(_) => "add",
            Action::Remove(_) => "remove",
            Action::Commit(_) => "commit",
            Action::Reset(_) => "reset",
        }
    }
}

/// An action requested for one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Owner the action applies to.
    pub owner: OwnerId,
    /// The action.
    pub action: Action,
}

impl Request {
    /// Creates a request.
    pub fn new(owner: OwnerId, action: Action) -> Self {
        Self { owner, action }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} for {}", self.action.name(), self.action.collection(), self.owner)
    }
}

/// Direction of an interactive allocation adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Raise by one step.
    Increase,
    /// Lower by one step.
    Decrease,
}

/// Runs domain actions for an owner.
///
/// Every mutation goes through the [`SyncEngine`], so it lands in both
/// stores under a fresh table stamp. Allocation percentages are kept
/// proportionate with the [`Calibrator`] after each structural change.
pub struct ActionHandlers {
    config: ServiceConfig,
    engine: Arc<SyncEngine>,
    calibrator: Calibrator,
    contacts: Arc<dyn ContactLookup>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn RefreshNotifier>,
}

impl ActionHandlers {
    /// Creates handlers with collaborators that do nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured precision is out of range.
    pub fn new(config: ServiceConfig, engine: Arc<SyncEngine>) -> ServiceResult<Self> {
        let calibrator = Calibrator::new(config.sync.precision)?;
        Ok(Self {
            config,
            engine,
            calibrator,
            contacts: Arc::new(NoContacts),
            directory: Arc::new(EmptyDirectory),
            notifier: Arc::new(SilentNotifier),
        })
    }

    /// Sets the contact lookup.
    #[must_use]
    pub fn with_contacts(mut self, contacts: Arc<dyn ContactLookup>) -> Self {
        self.contacts = contacts;
        self
    }

    /// Sets the directory.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = directory;
        self
    }

    /// Sets the refresh notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn RefreshNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Gets the sync engine.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Gets the configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Runs one request and signals the notifier on success.
    pub fn handle(&self, request: &Request) -> ServiceResult<()> {
        let owner = &request.owner;
        let collection = request.action.collection();
        tracing::debug!(owner = %owner, action = request.action.name(), collection = %collection, "handling request");

        match &request.action {
            Action::Fetch(collection) => self.fetch(owner, *collection)?,
            Action::Add(entities) => self.add(owner, &entities.owned_by(owner))?,
            Action::Remove(entities) => self.remove(owner, &entities.owned_by(owner))?,
            Action::Commit(Entities::Allocation(batch)) => {
                self.commit(owner, batch)?;
            }
            Action::Commit(other) => {
                return Err(ServiceError::Unsupported {
                    action: "commit",
                    collection: other.collection(),
                });
            }
            Action::Reset(collection) => self.reset(owner, *collection)?,
        }

        self.notifier.data_changed(owner, collection);
        Ok(())
    }

    /// Reconciles a synchronized collection, or refreshes search results.
    pub fn fetch(&self, owner: &OwnerId, collection: Collection) -> ServiceResult<()> {
        if collection == Collection::SearchResult {
            let profile = self.require_profile(owner)?;
            match self.directory.search(owner, &profile.search) {
                Ok(results) => self.engine.replace_search_results(owner, &results)?,
                Err(e) => tracing::warn!(owner = %owner, error = %e, "directory search failed"),
            }
            return Ok(());
        }

        let result = self.engine.reconcile(owner, collection)?;
        tracing::info!(
            owner = %owner,
            collection = %collection,
            direction = %result.direction,
            rows = result.rows,
            degraded = result.is_degraded(),
            "fetched"
        );
        Ok(())
    }

    fn add(&self, owner: &OwnerId, entities: &Entities) -> ServiceResult<()> {
        match entities {
            Entities::Profile(profiles) => {
                self.engine.put(owner, profiles)?;
            }
            Entities::Allocation(allocations) => self.add_allocations(owner, allocations)?,
            Entities::History(entries) => self.record_history(owner, entries)?,
            Entities::SearchResult(results) => {
                self.engine.put(owner, results)?;
            }
        }
        Ok(())
    }

    fn remove(&self, owner: &OwnerId, entities: &Entities) -> ServiceResult<()> {
        match entities {
            Entities::Profile(profiles) => {
                self.engine.remove(owner, profiles)?;
            }
            Entities::Allocation(allocations) => {
                for allocation in allocations {
                    self.remove_beneficiary(owner, &allocation.beneficiary_id)?;
                }
            }
            Entities::History(entries) => self.remove_history(owner, entries)?,
            Entities::SearchResult(results) => {
                self.engine.remove(owner, results)?;
            }
        }
        Ok(())
    }

    fn reset(&self, owner: &OwnerId, collection: Collection) -> ServiceResult<()> {
        match collection {
            Collection::Profile => self.delete_account(owner),
            Collection::History => self.reset_history(owner),
            Collection::Allocation | Collection::SearchResult => {
                self.engine.clear(owner, collection)?;
                Ok(())
            }
        }
    }

    /// Splits incoming allocations into updates of persisted beneficiaries
    /// and new beneficiaries.
    ///
    /// An update set that is exactly the persisted set minus one deletes the
    /// missing allocation.
    fn add_allocations(&self, owner: &OwnerId, incoming: &[Allocation]) -> ServiceResult<()> {
        let persisted = self.allocations(owner)?;
        let known: HashSet<&str> = persisted.iter().map(|a| a.beneficiary_id.as_str()).collect();
        let (updates, fresh): (Vec<&Allocation>, Vec<&Allocation>) = incoming
            .iter()
            .partition(|a| known.contains(a.beneficiary_id.as_str()));

        if !updates.is_empty() {
            if fresh.is_empty() && updates.len() + 1 == persisted.len() {
                let kept: HashSet<&str> = updates.iter().map(|a| a.beneficiary_id.as_str()).collect();
                let missing: Vec<Allocation> = persisted
                    .iter()
                    .filter(|a| !kept.contains(a.beneficiary_id.as_str()))
                    .cloned()
                    .collect();
                tracing::debug!(owner = %owner, removed = missing.len(), "update dropped one allocation");
                self.engine.remove(owner, &missing)?;
            }
            let updates: Vec<Allocation> = updates.into_iter().cloned().collect();
            self.engine.put(owner, &updates)?;
        }

        for allocation in fresh {
            self.add_beneficiary(owner, allocation.clone())?;
        }
        Ok(())
    }

    /// Adds a beneficiary.
    ///
    /// The first beneficiary takes the whole pool; later ones start at zero.
    /// Impact and frequency are seeded from the owner's history, missing
    /// contact details are looked up, and the giving pool is raised to the
    /// configured minimum per beneficiary.
    pub fn add_beneficiary(&self, owner: &OwnerId, mut allocation: Allocation) -> ServiceResult<()> {
        allocation.owner = owner.clone();
        let mut allocations = self.allocations(owner)?;
        if allocations
            .iter()
            .any(|a| a.beneficiary_id == allocation.beneficiary_id)
        {
            self.engine.put(owner, &[allocation])?;
            return Ok(());
        }

        allocation.percent = if !allocations.is_empty() && self.calibrator.is_proportionate(&percents(&allocations)) {
            0.0
        } else {
            1.0
        };

        let history = self.history(owner)?;
        let matching = history
            .iter()
            .filter(|h| h.beneficiary_id == allocation.beneficiary_id);
        allocation.impact = matching.clone().map(|h| h.amount).sum();
        allocation.frequency = u32::try_from(matching.count()).unwrap_or(u32::MAX);

        if allocation.phone.is_empty() && allocation.email.is_empty() && allocation.social.is_empty() {
            match self.contacts.lookup(&allocation.beneficiary_id) {
                Ok(details) => {
                    allocation.phone = details.phone;
                    allocation.email = details.email;
                    allocation.social = details.social;
                }
                Err(e) => {
                    tracing::warn!(beneficiary = %allocation.beneficiary_id, error = %e, "contact lookup failed");
                }
            }
        }

        tracing::info!(owner = %owner, beneficiary = %allocation.beneficiary_id, percent = allocation.percent, "adding beneficiary");
        allocations.push(allocation);

        let mut shares = percents(&allocations);
        if self.calibrator.recalibrate(&mut shares, false)? {
            set_percents(&mut allocations, &shares);
        }
        self.engine.put(owner, &allocations)?;

        if let Some(mut profile) = self.engine.local_profile(owner)? {
            let floor = allocations.len() as f64 * self.config.min_pool_per_beneficiary;
            if profile.giving_pool < floor {
                profile.giving_pool = floor;
                self.engine.put(owner, &[profile])?;
            }
        }
        Ok(())
    }

    /// Removes a beneficiary and recalibrates the remaining shares.
    ///
    /// Returns false if the owner has no such allocation.
    pub fn remove_beneficiary(&self, owner: &OwnerId, beneficiary_id: &str) -> ServiceResult<bool> {
        let mut allocations = self.allocations(owner)?;
        let Some(index) = allocations
            .iter()
            .position(|a| a.beneficiary_id == beneficiary_id)
        else {
            return Ok(false);
        };

        let mut shares = percents(&allocations);
        let (_, adjusted) = self.calibrator.remove_at(&mut shares, index)?;
        let removed = allocations.remove(index);
        set_percents(&mut allocations, &shares);

        self.engine.remove(owner, &[removed])?;
        self.engine.put(owner, &allocations)?;
        tracing::info!(owner = %owner, beneficiary = beneficiary_id, recalibrated = adjusted, "removed beneficiary");
        Ok(true)
    }

    /// Stores history entries and re-derives the impact of each affected
    /// beneficiary from all its entries.
    fn record_history(&self, owner: &OwnerId, entries: &[HistoryEntry]) -> ServiceResult<()> {
        self.engine.put(owner, entries)?;

        let touched: BTreeSet<&str> = entries.iter().map(|e| e.beneficiary_id.as_str()).collect();
        let history = self.history(owner)?;
        let updated: Vec<Allocation> = self
            .allocations(owner)?
            .into_iter()
            .filter(|a| touched.contains(a.beneficiary_id.as_str()))
            .map(|mut a| {
                a.impact = history
                    .iter()
                    .filter(|h| h.beneficiary_id == a.beneficiary_id)
                    .map(|h| h.amount)
                    .sum();
                a
            })
            .collect();
        self.engine.put(owner, &updated)?;
        Ok(())
    }

    /// Deletes history entries and reverses them on their allocations.
    fn remove_history(&self, owner: &OwnerId, entries: &[HistoryEntry]) -> ServiceResult<()> {
        let stored: HashSet<i64> = self.history(owner)?.iter().map(|h| h.time).collect();
        let entries: Vec<&HistoryEntry> = entries.iter().filter(|e| stored.contains(&e.time)).collect();
        if entries.is_empty() {
            return Ok(());
        }

        let owned: Vec<HistoryEntry> = entries.iter().map(|e| (*e).clone()).collect();
        self.engine.remove(owner, &owned)?;

        let mut allocations = self.allocations(owner)?;
        let mut changed = BTreeSet::new();
        for entry in &entries {
            if let Some(allocation) = allocations
                .iter_mut()
                .find(|a| a.beneficiary_id == entry.beneficiary_id)
            {
                allocation.frequency = allocation.frequency.saturating_sub(1);
                allocation.impact = (allocation.impact - entry.amount).max(0.0);
                changed.insert(allocation.beneficiary_id.clone());
            }
        }

        let updated: Vec<Allocation> = allocations
            .into_iter()
            .filter(|a| changed.contains(&a.beneficiary_id))
            .collect();
        self.engine.put(owner, &updated)?;
        tracing::info!(owner = %owner, entries = owned.len(), "reversed history entries");
        Ok(())
    }

    fn reset_history(&self, owner: &OwnerId) -> ServiceResult<()> {
        self.engine.clear(owner, Collection::History)?;
        let allocations: Vec<Allocation> = self
            .allocations(owner)?
            .into_iter()
            .map(|mut a| {
                a.impact = 0.0;
                a.frequency = 0;
                a
            })
            .collect();
        self.engine.put(owner, &allocations)?;
        Ok(())
    }

    /// Deletes every collection of the owner from both stores, the Profile
    /// last.
    pub fn delete_account(&self, owner: &OwnerId) -> ServiceResult<()> {
        for collection in [Collection::Allocation, Collection::History, Collection::SearchResult] {
            self.engine.clear(owner, collection)?;
        }
        self.engine.clear(owner, Collection::Profile)?;
        tracing::info!(owner = %owner, "deleted account");
        Ok(())
    }

    /// Commits one transaction batch.
    ///
    /// Each allocation with a positive share gives `percent * giving_pool`,
    /// rounded by the profile's policy, and records one history entry with a
    /// time after the schedule anchor. An empty batch commits every
    /// persisted allocation. Batch items only select beneficiaries: shares,
    /// impact and frequency come from the persisted allocations, and ids the
    /// owner never added are skipped. Returns the recorded entries.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NoActiveProfile` if the owner has no local
    /// profile; without it there is no giving pool or schedule to commit
    /// against.
    pub fn commit(&self, owner: &OwnerId, batch: &[Allocation]) -> ServiceResult<Vec<HistoryEntry>> {
        let mut profile = self.require_profile(owner)?;
        let persisted = self.allocations(owner)?;
        let batch = if batch.is_empty() {
            persisted
        } else {
            let selected: HashSet<&str> = batch.iter().map(|a| a.beneficiary_id.as_str()).collect();
            let unknown = selected
                .iter()
                .filter(|id| !persisted.iter().any(|a| a.beneficiary_id == **id))
                .count();
            if unknown > 0 {
                tracing::warn!(owner = %owner, unknown, "skipping unknown beneficiaries in commit batch");
            }
            persisted
                .into_iter()
                .filter(|a| selected.contains(a.beneficiary_id.as_str()))
                .collect()
        };

        let now = self.engine.clock().now();
        if profile.schedule_mode == ScheduleMode::Rolling
            && utc_day(profile.schedule_anchor) != utc_day(now)
        {
            profile.schedule_anchor = now;
        }

        let taken: HashSet<i64> = self.history(owner)?.iter().map(|h| h.time).collect();
        let rounding = profile.rounding;
        let mut updated = Vec::new();
        let mut entries = Vec::new();
        for mut allocation in batch.into_iter().filter(|a| a.percent > 0.0) {
            let amount = rounding.apply(allocation.percent * profile.giving_pool);
            allocation.impact = rounding.apply(allocation.impact + amount);
            allocation.frequency = allocation.frequency.saturating_add(1);

            profile.schedule_anchor = next_free_time(profile.schedule_anchor, &taken);
            let mut entry = HistoryEntry::new(
                owner.clone(),
                profile.schedule_anchor,
                allocation.beneficiary_id.clone(),
                allocation.name.clone(),
                amount,
            );
            entry.stamp = now;
            entries.push(entry);
            updated.push(allocation);
        }

        if profile.schedule_mode == ScheduleMode::Pinned {
            profile.schedule_anchor = now;
            profile.schedule_mode = ScheduleMode::Rolling;
        }

        self.engine.put(owner, &updated)?;
        self.engine.put(owner, &entries)?;
        self.engine.put(owner, &[profile])?;

        tracing::info!(
            owner = %owner,
            entries = entries.len(),
            total = entries.iter().map(|e| e.amount).sum::<f64>(),
            "committed batch"
        );
        Ok(entries)
    }

    /// Shifts one allocation by the profile's step and mirrors the set.
    ///
    /// `index` follows the owner's allocations ordered by beneficiary id.
    /// Returns false when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NoActiveProfile` if the owner has no local
    /// profile to take the step from.
    pub fn adjust(&self, owner: &OwnerId, index: usize, adjustment: Adjustment) -> ServiceResult<bool> {
        let profile = self.require_profile(owner)?;
        let mut allocations = self.allocations(owner)?;
        let magnitude = match adjustment {
            Adjustment::Increase => profile.step,
            Adjustment::Decrease => -profile.step,
        };

        let mut shares = percents(&allocations);
        if !self.calibrator.shift(&mut shares, index, magnitude)? {
            return Ok(false);
        }
        set_percents(&mut allocations, &shares);
        self.engine.put(owner, &allocations)?;
        self.notifier.data_changed(owner, Collection::Allocation);
        Ok(true)
    }

    /// Resets every share to an equal split and mirrors the set.
    ///
    /// Returns false when the owner has no allocations.
    pub fn reset_shares(&self, owner: &OwnerId) -> ServiceResult<bool> {
        let mut allocations = self.allocations(owner)?;
        let mut shares = percents(&allocations);
        if !self.calibrator.reset(&mut shares, true)? {
            return Ok(false);
        }
        set_percents(&mut allocations, &shares);
        self.engine.put(owner, &allocations)?;
        self.notifier.data_changed(owner, Collection::Allocation);
        Ok(true)
    }

    fn require_profile(&self, owner: &OwnerId) -> ServiceResult<Profile> {
        self.engine
            .local_profile(owner)?
            .ok_or_else(|| ServiceError::NoActiveProfile(owner.clone()))
    }

    fn allocations(&self, owner: &OwnerId) -> ServiceResult<Vec<Allocation>> {
        Ok(Table::<Allocation>::new(self.engine.local()).all(owner)?)
    }

    fn history(&self, owner: &OwnerId) -> ServiceResult<Vec<HistoryEntry>> {
        Ok(Table::<HistoryEntry>::new(self.engine.local()).all(owner)?)
    }
}

fn percents(allocations: &[Allocation]) -> Vec<f64> {
    allocations.iter().map(|a| a.percent).collect()
}

fn set_percents(allocations: &mut [Allocation], shares: &[f64]) {
    for (allocation, share) in allocations.iter_mut().zip(shares) {
        allocation.percent = *share;
    }
}

fn utc_day(millis: i64) -> i64 {
    millis.div_euclid(MILLIS_PER_DAY)
}

/// Returns the first time after `anchor` not already used by a history entry.
fn next_free_time(anchor: i64, taken: &HashSet<i64>) -> i64 {
    let mut time = anchor.saturating_add(1);
    while taken.contains(&time) {
        time = time.saturating_add(1);
    }
    time
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_day_boundaries() {
        assert_eq!(utc_day(0), 0);
        assert_eq!(utc_day(MILLIS_PER_DAY - 1), 0);
        assert_eq!(utc_day(MILLIS_PER_DAY), 1);
        assert_eq!(utc_day(-1), -1);
    }

    #[test]
    fn next_free_time_skips_taken() {
        let taken: HashSet<i64> = [11, 12, 14].into_iter().collect();
        assert_eq!(next_free_time(10, &taken), 13);
        assert_eq!(next_free_time(13, &taken), 15);
        assert_eq!(next_free_time(0, &HashSet::new()), 1);
    }

    #[test]
    fn action_collection_and_name() {
        let owner = OwnerId::new("u1");
        let request = Request::new(
            owner.clone(),
            Action::Add(Entities::History(vec![HistoryEntry::new(owner, 1, "b1", "A", 1.0)])),
        );
        assert_eq!(request.action.collection(), Collection::History);
        assert_eq!(request.to_string(), "add history for u1");
        assert_eq!(Action::Reset(Collection::Profile).name(), "reset");
        assert!(Entities::Allocation(Vec::new()).is_empty());
    }

    #[test]
    fn owned_by_reassigns_every_entity() {
        let stranger = OwnerId::new("u2");
        let owner = OwnerId::new("u1");
        let entities = Entities::Allocation(vec![
            Allocation::new(stranger.clone(), "b1", "A"),
            Allocation::new(owner.clone(), "b2", "B"),
        ]);

        let Entities::Allocation(claimed) = entities.owned_by(&owner) else {
            panic!("collection changed");
        };
        assert!(claimed.iter().all(|a| a.owner == owner));
        assert_eq!(claimed[0].beneficiary_id, "b1");
        assert_eq!(entities.owned_by(&owner).collection(), Collection::Allocation);
    }
}
