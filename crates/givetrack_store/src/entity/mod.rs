//! Entity types and their row mappings.

mod allocation;
mod history;
mod profile;
mod search;

pub use allocation::Allocation;
pub use history::HistoryEntry;
pub use profile::{Profile, RoundingPolicy, ScheduleMode, SearchPreferences};
pub use search::SearchResult;

use crate::error::StoreResult;
use crate::types::{Collection, OwnerId};
use crate::value::Row;

/// Trait for types that can be stored as rows.
///
/// Implementors provide an explicit, ordered field list and pure mapping
/// functions in both directions. `key()` must be stable for the lifetime of
/// the entity: stores use `(owner, key)` for insert-or-replace.
pub trait Record: Sized + Clone {
    /// Collection holding this entity.
    const COLLECTION: Collection;

    /// Field names written by `to_row`, in declaration order.
    const FIELDS: &'static [&'static str];

    /// Returns the owning identity.
    fn owner(&self) -> &OwnerId;

    /// Returns the identity key within the owner's collection.
    fn key(&self) -> String;

    /// Maps the entity to a row.
    fn to_row(&self) -> Row;

    /// Maps a row back to the entity.
    fn from_row(row: &Row) -> StoreResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_fields_match<T: Record>(entity: &T) {
        let row = entity.to_row();
        let mut written: Vec<&str> = row.fields.keys().map(String::as_str).collect();
        let mut declared = T::FIELDS.to_vec();
        written.sort_unstable();
        declared.sort_unstable();
        assert_eq!(written, declared, "{} field list drifted", T::COLLECTION);
        assert_eq!(row.key, entity.key());
        assert_eq!(&row.owner, entity.owner());
    }

    #[test]
    fn field_lists_cover_rows() {
        let owner = OwnerId::new("u1");
        assert_fields_match(&Profile::new(owner.clone(), "a@b.c"));
        assert_fields_match(&Allocation::new(owner.clone(), "12-3456789", "Food Bank"));
        assert_fields_match(&HistoryEntry::new(owner.clone(), 7, "12-3456789", "Food Bank", 4.5));
        assert_fields_match(&SearchResult::new(owner, "12-3456789", "Food Bank"));
    }
}
