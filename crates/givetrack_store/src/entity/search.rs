//! Ephemeral directory search results.

use crate::entity::Record;
use crate::error::StoreResult;
use crate::types::{Collection, OwnerId};
use crate::value::Row;

/// A transient directory candidate.
///
/// Stored locally only and fully replaced on each search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Owning identity.
    pub owner: OwnerId,
    /// External directory id; the row key.
    pub beneficiary_id: String,
    /// Display name.
    pub name: String,
    /// Display location.
    pub location: String,
    /// Homepage URL.
    pub homepage: String,
    /// Directory rating.
    pub rating: f64,
}

impl SearchResult {
    /// Creates a result.
    pub fn new(owner: OwnerId, beneficiary_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner,
            beneficiary_id: beneficiary_id.into(),
            name: name.into(),
            location: String::new(),
            homepage: String::new(),
            rating: 0.0,
        }
    }
}

impl Record for SearchResult {
    const COLLECTION: Collection = Collection::SearchResult;
    const FIELDS: &'static [&'static str] = &["name", "location", "homepage", "rating"];

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn key(&self) -> String {
        self.beneficiary_id.clone()
    }

    fn to_row(&self) -> Row {
        Row::new(self.owner.clone(), self.key())
            .with("name", self.name.as_str())
            .with("location", self.location.as_str())
            .with("homepage", self.homepage.as_str())
            .with("rating", self.rating)
    }

    fn from_row(row: &Row) -> StoreResult<Self> {
        let r = row.reader(Collection::SearchResult);
        Ok(Self {
            owner: row.owner.clone(),
            beneficiary_id: row.key.clone(),
            name: r.text("name")?,
            location: r.text("location")?,
            homepage: r.text("homepage")?,
            rating: r.real("rating")?,
        })
    }
}
