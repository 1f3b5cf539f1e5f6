//! Core type definitions for Givetrack stores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity token grouping every row of one signed-in user.
///
/// Local and remote stores namespace all rows by this value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Creates an owner ID from an identity token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Mints a random owner ID (v4 UUID).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty token of a signed-out session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// The four logical record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Profile and settings, one per owner.
    Profile,
    /// Beneficiary allocations.
    Allocation,
    /// Completed transactions.
    History,
    /// Ephemeral directory candidates, local only.
    SearchResult,
}

impl Collection {
    /// Every collection.
    pub const ALL: [Collection; 4] = [
        Collection::Profile,
        Collection::Allocation,
        Collection::History,
        Collection::SearchResult,
    ];

    /// Collections reconciled through table stamps.
    pub const SYNCHRONIZED: [Collection; 3] =
        [Collection::Profile, Collection::Allocation, Collection::History];

    /// Returns the collection name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Profile => "profile",
            Collection::Allocation => "allocation",
            Collection::History => "history",
            Collection::SearchResult => "search_result",
        }
    }

    /// Returns the Profile field holding this collection's table stamp.
    #[must_use]
    pub const fn stamp_field(self) -> Option<&'static str> {
        match self {
            Collection::Profile => Some("profile_stamp"),
            Collection::Allocation => Some("allocation_stamp"),
            Collection::History => Some("history_stamp"),
            Collection::SearchResult => None,
        }
    }

    /// Returns true if the collection participates in reconciliation.
    #[must_use]
    pub const fn is_synchronized(self) -> bool {
        self.stamp_field().is_some()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// Row selection for deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every row of the owner.
    All,
    /// Rows whose identity key is listed.
    Keys(Vec<String>),
}

impl Filter {
    /// Selects a single key.
    pub fn key(key: impl Into<String>) -> Self {
        Filter::Keys(vec![key.into()])
    }

    /// Returns true if the key is selected.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Keys(keys) => keys.iter().any(|k| k == key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_generation() {
        let a = OwnerId::generate();
        let b = OwnerId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert!(OwnerId::new("").is_empty());
        assert_eq!(OwnerId::from("u-1").to_string(), "u-1");
    }

    #[test]
    fn collection_names_roundtrip() {
        for collection in Collection::ALL {
            assert_eq!(collection.name().parse::<Collection>().unwrap(), collection);
        }
        assert!("spawn".parse::<Collection>().is_err());
    }

    #[test]
    fn only_search_results_lack_stamps() {
        assert!(!Collection::SearchResult.is_synchronized());
        for collection in Collection::SYNCHRONIZED {
            assert!(collection.stamp_field().is_some());
        }
    }

    #[test]
    fn filter_matching() {
        assert!(Filter::All.matches("anything"));
        let filter = Filter::Keys(vec!["a".into(), "b".into()]);
        assert!(filter.matches("b"));
        assert!(!filter.matches("c"));
        assert!(Filter::key("x").matches("x"));
    }
}
