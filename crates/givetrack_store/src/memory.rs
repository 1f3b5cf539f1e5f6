//! In-memory store.

use crate::backend::EntityStore;
use crate::error::StoreResult;
use crate::types::{Collection, Filter, OwnerId};
use crate::value::Row;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Rows of every collection, keyed by `(owner, key)`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    tables: HashMap<Collection, BTreeMap<(OwnerId, String), Row>>,
}

impl Tables {
    pub(crate) fn query(&self, collection: Collection, owner: &OwnerId) -> Vec<Row> {
        self.tables
            .get(&collection)
            .map(|table| {
                table
                    .iter()
                    .filter(|((o, _), _)| o == owner)
                    .map(|(_, row)| row.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn insert(&mut self, collection: Collection, rows: &[Row]) {
        let table = self.tables.entry(collection).or_default();
        for row in rows {
            table.insert((row.owner.clone(), row.key.clone()), row.clone());
        }
    }

    pub(crate) fn delete(&mut self, collection: Collection, owner: &OwnerId, filter: &Filter) -> usize {
        let Some(table) = self.tables.get_mut(&collection) else {
            return 0;
        };
        let before = table.len();
        table.retain(|(o, key), _| o != owner || !filter.matches(key));
        before - table.len()
    }

    pub(crate) fn len(&self, collection: Collection) -> usize {
        self.tables.get(&collection).map_or(0, BTreeMap::len)
    }

    pub(crate) fn into_rows(self) -> Vec<(Collection, Vec<Row>)> {
        let mut out: Vec<_> = self
            .tables
            .into_iter()
            .map(|(collection, table)| (collection, table.into_values().collect()))
            .collect();
        out.sort_by_key(|(collection, _)| *collection);
        out
    }

    pub(crate) fn from_rows(rows: Vec<(Collection, Vec<Row>)>) -> Self {
        let mut tables = Self::default();
        for (collection, rows) in rows {
            tables.insert(collection, &rows);
        }
        tables
    }
}

/// An in-memory store.
///
/// This store keeps all rows in memory and is suitable for:
/// - Unit and integration tests
/// - Standing in for the remote store in simulations
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads. Every call,
/// including `replace_all`, runs under one lock acquisition.
///
/// # Example
///
/// ```rust
/// use givetrack_store::{Collection, EntityStore, MemoryStore, OwnerId, Row};
///
/// let store = MemoryStore::new();
/// let owner = OwnerId::new("u1");
/// store.insert_or_replace(Collection::SearchResult, &[Row::new(owner.clone(), "a")]).unwrap();
/// assert_eq!(store.query(Collection::SearchResult, &owner).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows in `collection` across all owners.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.tables.read().len(collection)
    }

    /// Returns true if no collection holds any row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let tables = self.tables.read();
        Collection::ALL.iter().all(|c| tables.len(*c) == 0)
    }

    /// Removes every row.
    pub fn clear(&self) {
        *self.tables.write() = Tables::default();
    }
}

impl EntityStore for MemoryStore {
    fn query(&self, collection: Collection, owner: &OwnerId) -> StoreResult<Vec<Row>> {
        Ok(self.tables.read().query(collection, owner))
    }

    fn insert_or_replace(&self, collection: Collection, rows: &[Row]) -> StoreResult<()> {
        self.tables.write().insert(collection, rows);
        Ok(())
    }

    fn delete_matching(
        &self,
        collection: Collection,
        owner: &OwnerId,
        filter: &Filter,
    ) -> StoreResult<usize> {
        Ok(self.tables.write().delete(collection, owner, filter))
    }

    fn replace_all(&self, collection: Collection, owner: &OwnerId, rows: &[Row]) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.delete(collection, owner, &Filter::All);
        tables.insert(collection, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Profile, Record};
    use crate::value::Value;

    fn row(owner: &str, key: &str) -> Row {
        Row::new(OwnerId::new(owner), key).with("name", key)
    }

    #[test]
    fn insert_replaces_by_identity() {
        let store = MemoryStore::new();
        store
            .insert_or_replace(Collection::Allocation, &[row("u1", "a"), row("u1", "b")])
            .unwrap();
        store
            .insert_or_replace(Collection::Allocation, &[row("u1", "a").with("name", "renamed")])
            .unwrap();

        let rows = store.query(Collection::Allocation, &OwnerId::new("u1")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&Value::from("renamed")));
    }

    #[test]
    fn owners_are_isolated() {
        let store = MemoryStore::new();
        store
            .insert_or_replace(Collection::History, &[row("u1", "1"), row("u2", "1")])
            .unwrap();

        let removed = store
            .delete_matching(Collection::History, &OwnerId::new("u1"), &Filter::All)
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(Collection::History), 1);
        assert_eq!(store.query(Collection::History, &OwnerId::new("u2")).unwrap().len(), 1);
    }

    #[test]
    fn delete_by_keys() {
        let store = MemoryStore::new();
        let owner = OwnerId::new("u1");
        store
            .insert_or_replace(Collection::Allocation, &[row("u1", "a"), row("u1", "b"), row("u1", "c")])
            .unwrap();
        let removed = store
            .delete_matching(Collection::Allocation, &owner, &Filter::Keys(vec!["a".into(), "c".into()]))
            .unwrap();
        assert_eq!(removed, 2);
        let keys: Vec<_> = store
            .query(Collection::Allocation, &owner)
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["b"]);
    }

    #[test]
    fn replace_all_swaps_owner_rows() {
        let store = MemoryStore::new();
        let owner = OwnerId::new("u1");
        store
            .insert_or_replace(Collection::Allocation, &[row("u1", "a"), row("u2", "z")])
            .unwrap();
        store
            .replace_all(Collection::Allocation, &owner, &[row("u1", "b"), row("u1", "c")])
            .unwrap();

        let keys: Vec<_> = store
            .query(Collection::Allocation, &owner)
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert_eq!(store.len(Collection::Allocation), 3);
    }

    #[test]
    fn table_stamps_live_on_profile() {
        let store = MemoryStore::new();
        let owner = OwnerId::new("u1");

        // No profile: reads default, writes are dropped.
        assert_eq!(store.read_table_stamp(&owner, Collection::Allocation).unwrap(), 0);
        assert!(!store.write_table_stamp(&owner, Collection::Allocation, 10).unwrap());
        assert!(store.is_empty());

        store
            .insert_or_replace(Collection::Profile, &[Profile::new(owner.clone(), "a@b.c").to_row()])
            .unwrap();
        assert!(store.write_table_stamp(&owner, Collection::Allocation, 10).unwrap());
        assert_eq!(store.read_table_stamp(&owner, Collection::Allocation).unwrap(), 10);
        assert_eq!(store.read_table_stamp(&owner, Collection::History).unwrap(), 0);

        assert!(store.read_table_stamp(&owner, Collection::SearchResult).is_err());
    }
}
