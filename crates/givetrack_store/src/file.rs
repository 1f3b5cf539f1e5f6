//! File-backed store for the persistent device store.

use crate::backend::EntityStore;
use crate::error::{StoreError, StoreResult};
use crate::memory::Tables;
use crate::types::{Collection, Filter, OwnerId};
use crate::value::Row;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File names within the store directory.
const SNAPSHOT_FILE: &str = "store.cbor";
const SNAPSHOT_TEMP: &str = "store.cbor.tmp";
const LOCK_FILE: &str = "LOCK";

/// Snapshot format version.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    tables: Vec<(Collection, Vec<Row>)>,
}

/// A file-backed store.
///
/// ```text
/// <dir>/
/// ├─ LOCK            # Advisory lock for single-writer
/// └─ store.cbor      # CBOR snapshot of every collection
/// ```
///
/// # Durability
///
/// Every mutating call writes a full snapshot to a temporary file, syncs it
/// and renames it over the previous snapshot. A call either becomes durable
/// in full or leaves the previous state in place, so `replace_all` is
/// transactional.
///
/// # Example
///
/// ```no_run
/// use givetrack_store::FileStore;
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("device_store")).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    tables: RwLock<Tables>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if another process holds the store,
    /// or an I/O or codec error if the snapshot cannot be read.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(dir.to_path_buf()));
        }

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let tables = if snapshot_path.exists() {
            let reader = BufReader::new(File::open(&snapshot_path)?);
            let snapshot: Snapshot =
                ciborium::from_reader(reader).map_err(|e| StoreError::Codec(e.to_string()))?;
            if snapshot.version != FORMAT_VERSION {
                return Err(StoreError::Codec(format!(
                    "unsupported snapshot version {}",
                    snapshot.version
                )));
            }
            Tables::from_rows(snapshot.tables)
        } else {
            Tables::default()
        };

        tracing::debug!(dir = %dir.display(), "opened file store");

        Ok(Self {
            dir: dir.to_path_buf(),
            tables: RwLock::new(tables),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the number of rows in `collection` across all owners.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.tables.read().len(collection)
    }

    /// Applies `change` to a copy of the tables, persists it, then publishes it.
    fn mutate<R>(&self, change: impl FnOnce(&mut Tables) -> R) -> StoreResult<R> {
        let mut tables = self.tables.write();
        let mut next = tables.clone();
        let result = change(&mut next);
        self.persist(&next)?;
        *tables = next;
        Ok(result)
    }

    fn persist(&self, tables: &Tables) -> StoreResult<()> {
        let snapshot = Snapshot {
            version: FORMAT_VERSION,
            tables: tables.clone().into_rows(),
        };

        let temp_path = self.dir.join(SNAPSHOT_TEMP);
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        ciborium::into_writer(&snapshot, &mut writer).map_err(|e| StoreError::Codec(e.to_string()))?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?
            .sync_all()?;

        fs::rename(&temp_path, self.dir.join(SNAPSHOT_FILE))?;
        Ok(())
    }
}

impl EntityStore for FileStore {
    fn query(&self, collection: Collection, owner: &OwnerId) -> StoreResult<Vec<Row>> {
        Ok(self.tables.read().query(collection, owner))
    }

    fn insert_or_replace(&self, collection: Collection, rows: &[Row]) -> StoreResult<()> {
        self.mutate(|tables| tables.insert(collection, rows))
    }

    fn delete_matching(
        &self,
        collection: Collection,
        owner: &OwnerId,
        filter: &Filter,
    ) -> StoreResult<usize> {
        self.mutate(|tables| tables.delete(collection, owner, filter))
    }

    fn replace_all(&self, collection: Collection, owner: &OwnerId, rows: &[Row]) -> StoreResult<()> {
        self.mutate(|tables| {
            tables.delete(collection, owner, &Filter::All);
            tables.insert(collection, rows);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Allocation, Profile, Record};
    use tempfile::TempDir;

    #[test]
    fn rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let owner = OwnerId::new("u1");

        {
            let store = FileStore::open(dir.path()).unwrap();
            store
                .insert_or_replace(Collection::Profile, &[Profile::new(owner.clone(), "a@b.c").to_row()])
                .unwrap();
            store
                .insert_or_replace(
                    Collection::Allocation,
                    &[Allocation::new(owner.clone(), "b1", "Food Bank").with_percent(1.0).to_row()],
                )
                .unwrap();
            store.write_table_stamp(&owner, Collection::Allocation, 77).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        let rows = store.query(Collection::Allocation, &owner).unwrap();
        assert_eq!(rows.len(), 1);
        let allocation = Allocation::from_row(&rows[0]).unwrap();
        assert_eq!(allocation.percent, 1.0);
        assert_eq!(store.read_table_stamp(&owner, Collection::Allocation).unwrap(), 77);
    }

    #[test]
    fn second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let _store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(FileStore::open(dir.path()), Err(StoreError::Locked(_))));
    }

    #[test]
    fn replace_all_persists() {
        let dir = TempDir::new().unwrap();
        let owner = OwnerId::new("u1");
        {
            let store = FileStore::open(dir.path()).unwrap();
            store
                .insert_or_replace(Collection::SearchResult, &[Row::new(owner.clone(), "old")])
                .unwrap();
            store
                .replace_all(Collection::SearchResult, &owner, &[Row::new(owner.clone(), "new")])
                .unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        let keys: Vec<_> = store
            .query(Collection::SearchResult, &owner)
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["new"]);
        assert_eq!(store.len(Collection::SearchResult), 1);
    }
}
