//! Typed table views over a store.

use crate::backend::EntityStore;
use crate::entity::Record;
use crate::error::StoreResult;
use crate::types::{Filter, OwnerId};
use std::marker::PhantomData;

/// A typed view of one collection in one store.
///
/// `Table<T>` maps rows to `T` and back through [`Record`]. It holds no
/// state beyond the store reference.
///
/// # Example
///
/// ```rust
/// use givetrack_store::{Allocation, MemoryStore, OwnerId, Table};
///
/// let store = MemoryStore::new();
/// let owner = OwnerId::new("u1");
/// let allocations = Table::<Allocation>::new(&store);
///
/// allocations.put(&[Allocation::new(owner.clone(), "b1", "Food Bank").with_percent(1.0)]).unwrap();
/// assert_eq!(allocations.all(&owner).unwrap().len(), 1);
/// ```
pub struct Table<'a, T: Record> {
    store: &'a dyn EntityStore,
    _marker: PhantomData<T>,
}

impl<'a, T: Record> Table<'a, T> {
    /// Creates a typed view.
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Returns every entity of the owner, ordered by key.
    pub fn all(&self, owner: &OwnerId) -> StoreResult<Vec<T>> {
        self.store
            .query(T::COLLECTION, owner)?
            .iter()
            .map(T::from_row)
            .collect()
    }

    /// Returns the entity with the given key, if any.
    pub fn find(&self, owner: &OwnerId, key: &str) -> StoreResult<Option<T>> {
        self.store
            .query(T::COLLECTION, owner)?
            .iter()
            .find(|row| row.key == key)
            .map(T::from_row)
            .transpose()
    }

    /// Inserts or replaces entities by identity.
    pub fn put(&self, entities: &[T]) -> StoreResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let rows: Vec<_> = entities.iter().map(T::to_row).collect();
        self.store.insert_or_replace(T::COLLECTION, &rows)
    }

    /// Deletes the given entities of the owner.
    pub fn delete(&self, owner: &OwnerId, entities: &[T]) -> StoreResult<usize> {
        let keys = entities.iter().map(T::key).collect();
        self.store.delete_matching(T::COLLECTION, owner, &Filter::Keys(keys))
    }

    /// Deletes every entity of the owner.
    pub fn clear(&self, owner: &OwnerId) -> StoreResult<usize> {
        self.store.delete_matching(T::COLLECTION, owner, &Filter::All)
    }

    /// Replaces every entity of the owner.
    pub fn replace(&self, owner: &OwnerId, entities: &[T]) -> StoreResult<()> {
        let rows: Vec<_> = entities.iter().map(T::to_row).collect();
        self.store.replace_all(T::COLLECTION, owner, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{HistoryEntry, Profile};
    use crate::memory::MemoryStore;

    #[test]
    fn typed_roundtrip_through_store() {
        let store = MemoryStore::new();
        let owner = OwnerId::new("u1");
        let history = Table::<HistoryEntry>::new(&store);

        history
            .put(&[
                HistoryEntry::new(owner.clone(), 1, "b1", "A", 1.0),
                HistoryEntry::new(owner.clone(), 2, "b2", "B", 2.0),
            ])
            .unwrap();

        let found = history.find(&owner, "2").unwrap().unwrap();
        assert_eq!(found.amount, 2.0);
        assert!(history.find(&owner, "3").unwrap().is_none());

        assert_eq!(history.delete(&owner, &[found]).unwrap(), 1);
        assert_eq!(history.all(&owner).unwrap().len(), 1);
        assert_eq!(history.clear(&owner).unwrap(), 1);
    }

    #[test]
    fn empty_put_is_noop() {
        let store = MemoryStore::new();
        Table::<Profile>::new(&store).put(&[]).unwrap();
        assert!(store.is_empty());
    }
}
