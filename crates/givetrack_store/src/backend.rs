//! Entity store adapter trait definition.

use crate::error::{StoreError, StoreResult};
use crate::types::{Collection, Filter, OwnerId};
use crate::value::{Row, Value};

/// Row-level CRUD against one store (local device or remote cloud).
///
/// Stores are **opaque row containers**. They know owners, identity keys and
/// the Profile row's stamp fields; they do not interpret entity types.
///
/// # Invariants
///
/// - Each call is atomic on its own
/// - `insert_or_replace` replaces any row with the same `(owner, key)`
/// - `replace_all` never exposes a partially replaced collection
/// - Stores must be `Send + Sync` for use from worker threads
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For tests and as a remote stand-in
/// - [`super::FileStore`] - For the persistent device store
pub trait EntityStore: Send + Sync {
    /// Returns every row of `owner` in `collection`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn query(&self, collection: Collection, owner: &OwnerId) -> StoreResult<Vec<Row>>;

    /// Inserts rows, replacing rows that share `(owner, key)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn insert_or_replace(&self, collection: Collection, rows: &[Row]) -> StoreResult<()>;

    /// Deletes the rows of `owner` selected by `filter`.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn delete_matching(
        &self,
        collection: Collection,
        owner: &OwnerId,
        filter: &Filter,
    ) -> StoreResult<usize>;

    /// Replaces every row of `owner` in `collection` with `rows`.
    ///
    /// The default runs delete then insert as two calls. Stores that can do
    /// better override it to apply both in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn replace_all(&self, collection: Collection, owner: &OwnerId, rows: &[Row]) -> StoreResult<()> {
        self.delete_matching(collection, owner, &Filter::All)?;
        if rows.is_empty() {
            return Ok(());
        }
        self.insert_or_replace(collection, rows)
    }

    /// Reads the table stamp of `collection` from the owner's Profile row.
    ///
    /// Returns 0 when the owner has no Profile row.
    ///
    /// # Errors
    ///
    /// Returns an error for collections without a stamp or if the store
    /// cannot be read.
    fn read_table_stamp(&self, owner: &OwnerId, collection: Collection) -> StoreResult<i64> {
        let field = collection
            .stamp_field()
            .ok_or(StoreError::Unsynchronized(collection))?;
        let rows = self.query(Collection::Profile, owner)?;
        Ok(rows
            .first()
            .and_then(|row| match row.get(field) {
                Some(Value::Integer(time)) => Some(*time),
                _ => None,
            })
            .unwrap_or(0))
    }

    /// Writes the table stamp of `collection` on the owner's Profile row.
    ///
    /// Returns false, writing nothing, when the owner has no Profile row:
    /// a stamp write never creates a profile.
    ///
    /// # Errors
    ///
    /// Returns an error for collections without a stamp or if the store
    /// cannot be written.
    fn write_table_stamp(&self, owner: &OwnerId, collection: Collection, time: i64) -> StoreResult<bool> {
        let field = collection
            .stamp_field()
            .ok_or(StoreError::Unsynchronized(collection))?;
        let mut rows = self.query(Collection::Profile, owner)?;
        let Some(mut row) = rows.pop() else {
            return Ok(false);
        };
        row.set(field, time);
        self.insert_or_replace(Collection::Profile, &[row])?;
        Ok(true)
    }
}
