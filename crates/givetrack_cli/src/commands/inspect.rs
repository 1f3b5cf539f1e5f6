//! Inspect command implementation.

use givetrack_store::{Collection, EntityStore, FileStore, OwnerId};
use serde::Serialize;
use std::path::Path;

/// Stamp and row count for one collection.
#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: &'static str,
    /// Table stamp, if the collection is synchronized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamp: Option<i64>,
    /// Rows held for the owner.
    pub rows: usize,
}

/// Snapshot of one store for one owner.
#[derive(Debug, Serialize)]
pub struct StoreInfo {
    /// Store directory.
    pub path: String,
    /// Whether the owner has a profile row.
    pub has_profile: bool,
    /// Per-collection details.
    pub collections: Vec<CollectionInfo>,
}

/// Reads stamps and row counts for `owner` from `store`.
pub fn describe(store: &dyn EntityStore, owner: &OwnerId, path: &Path) -> Result<StoreInfo, Box<dyn std::error::Error>> {
    let mut collections = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        let rows = store.query(collection, owner)?.len();
        let stamp = match collection.stamp_field() {
            Some(_) => Some(store.read_table_stamp(owner, collection)?),
            None => None,
        };
        collections.push(CollectionInfo {
            name: collection.name(),
            stamp,
            rows,
        });
    }
    let has_profile = !store.query(Collection::Profile, owner)?.is_empty();
    Ok(StoreInfo {
        path: path.display().to_string(),
        has_profile,
        collections,
    })
}

/// Runs the inspect command.
pub fn run(local: &Path, remote: Option<&Path>, owner: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let owner = OwnerId::new(owner);
    let mut stores = vec![("device", describe(&FileStore::open(local)?, &owner, local)?)];
    if let Some(remote) = remote {
        stores.push(("cloud", describe(&FileStore::open(remote)?, &owner, remote)?));
    }

    match format {
        "json" => {
            let mut map = serde_json::Map::new();
            for (label, info) in stores {
                map.insert(label.to_string(), serde_json::to_value(info)?);
            }
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        _ => {
            for (label, info) in &stores {
                println!("Givetrack {label} store");
                println!("==================");
                println!("Path:    {}", info.path);
                println!("Owner:   {owner}");
                println!("Profile: {}", if info.has_profile { "present" } else { "missing" });
                println!();
                println!("Collections:");
                for c in &info.collections {
                    match c.stamp {
                        Some(stamp) => println!("  {:<14} rows={:<6} stamp={stamp}", c.name, c.rows),
                        None => println!("  {:<14} rows={:<6} (device only)", c.name, c.rows),
                    }
                }
                println!();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use givetrack_store::{Allocation, Profile, Record};
    use tempfile::TempDir;

    #[test]
    fn describe_reports_stamps_and_rows() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let owner = OwnerId::new("u1");
        let mut profile = Profile::new(owner.clone(), "u1@example.org");
        profile.allocation_stamp = 42;
        store.insert_or_replace(Collection::Profile, &[profile.to_row()]).unwrap();
        store
            .insert_or_replace(
                Collection::Allocation,
                &[Allocation::new(owner.clone(), "b1", "One").with_percent(1.0).to_row()],
            )
            .unwrap();

        let info = describe(&store, &owner, dir.path()).unwrap();
        assert!(info.has_profile);
        let allocation = info.collections.iter().find(|c| c.name == "allocation").unwrap();
        assert_eq!(allocation.rows, 1);
        assert_eq!(allocation.stamp, Some(42));
        let search = info.collections.iter().find(|c| c.name == "search_result").unwrap();
        assert_eq!(search.stamp, None);
    }

    #[test]
    fn describe_without_profile() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let info = describe(&store, &OwnerId::new("nobody"), dir.path()).unwrap();
        assert!(!info.has_profile);
        assert!(info.collections.iter().all(|c| c.rows == 0));
    }
}
