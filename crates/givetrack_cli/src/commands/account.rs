//! Profile and beneficiary commands.

use super::Stores;
use givetrack_service::{Action, Entities, Request};
use givetrack_store::{Allocation, HistoryEntry, Profile, Table};
use serde::Serialize;

/// Creates the owner's profile and mirrors it to the cloud store.
pub fn init(stores: &Stores, email: &str, pool: f64) -> Result<(), Box<dyn std::error::Error>> {
    if pool < 0.0 || !pool.is_finite() {
        return Err(format!("giving pool must be a non-negative number, got {pool}").into());
    }
    let mut profile = Profile::new(stores.owner.clone(), email);
    profile.giving_pool = pool;
    stores.handlers.handle(&Request::new(
        stores.owner.clone(),
        Action::Add(Entities::Profile(vec![profile])),
    ))?;
    println!("Created profile for {}", stores.owner);
    Ok(())
}

/// Adds a beneficiary and prints the resulting shares.
pub fn add(stores: &Stores, id: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    stores
        .handlers
        .add_beneficiary(&stores.owner, Allocation::new(stores.owner.clone(), id, name))?;
    print_shares(stores)
}

/// Removes a beneficiary and prints the remaining shares.
pub fn remove(stores: &Stores, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !stores.handlers.remove_beneficiary(&stores.owner, id)? {
        return Err(format!("no beneficiary {id} for {}", stores.owner).into());
    }
    print_shares(stores)
}

/// One committed history entry.
#[derive(Debug, Serialize)]
pub struct CommittedEntry {
    /// Schedule time in epoch milliseconds.
    pub time: i64,
    /// Beneficiary identifier.
    pub beneficiary_id: String,
    /// Beneficiary name.
    pub name: String,
    /// Amount given.
    pub amount: f64,
}

impl From<&HistoryEntry> for CommittedEntry {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            time: entry.time,
            beneficiary_id: entry.beneficiary_id.clone(),
            name: entry.name.clone(),
            amount: entry.amount,
        }
    }
}

/// Commits every allocation and prints the new history entries.
pub fn commit(stores: &Stores, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let entries = stores.handlers.commit(&stores.owner, &[])?;
    let committed: Vec<CommittedEntry> = entries.iter().map(CommittedEntry::from).collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&committed)?),
        _ => {
            if committed.is_empty() {
                println!("Nothing to commit");
            }
            for entry in &committed {
                println!(
                    "{:>14}  {:<20} {:<24} {:.2}",
                    entry.time, entry.beneficiary_id, entry.name, entry.amount
                );
            }
        }
    }
    Ok(())
}

fn print_shares(stores: &Stores) -> Result<(), Box<dyn std::error::Error>> {
    let allocations = Table::<Allocation>::new(stores.handlers.engine().local()).all(&stores.owner)?;
    for allocation in &allocations {
        println!(
            "{:<20} {:<24} {:>7.2}%",
            allocation.beneficiary_id,
            allocation.name,
            allocation.percent * 100.0
        );
    }
    Ok(())
}
