//! Beneficiary allocations.

use crate::entity::Record;
use crate::error::StoreResult;
use crate::types::{Collection, OwnerId};
use crate::value::Row;

/// A beneficiary's share of the giving pool.
///
/// Percents across one owner's allocations sum to 1.0 within tolerance
/// unless the set is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
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
    /// Contact phone, best effort.
    pub phone: String,
    /// Contact email, best effort.
    pub email: String,
    /// Social handle, best effort.
    pub social: String,
    /// Share of the giving pool in `[0, 1]`.
    pub percent: f64,
    /// Cumulative amount given.
    pub impact: f64,
    /// Number of committed transactions.
    pub frequency: u32,
    /// Free-form type tag.
    pub kind: i64,
}

impl Allocation {
    /// Creates an allocation with zero share and no history.
    pub fn new(owner: OwnerId, beneficiary_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner,
            beneficiary_id: beneficiary_id.into(),
            name: name.into(),
            location: String::new(),
            homepage: String::new(),
            phone: String::new(),
            email: String::new(),
            social: String::new(),
            percent: 0.0,
            impact: 0.0,
            frequency: 0,
            kind: 0,
        }
    }

    /// Sets the percent, builder style.
    #[must_use]
    pub fn with_percent(mut self, percent: f64) -> Self {
        self.percent = percent;
        self
    }
}

impl Record for Allocation {
    const COLLECTION: Collection = Collection::Allocation;
    const FIELDS: &'static [&'static str] = &[
        "name",
        "location",
        "homepage",
        "phone",
        "email",
        "social",
        "percent",
        "impact",
        "frequency",
        "kind",
    ];

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
            .with("phone", self.phone.as_str())
            .with("email", self.email.as_str())
            .with("social", self.social.as_str())
            .with("percent", self.percent)
            .with("impact", self.impact)
            .with("frequency", self.frequency)
            .with("kind", self.kind)
    }

    fn from_row(row: &Row) -> StoreResult<Self> {
        let r = row.reader(Collection::Allocation);
        Ok(Self {
            owner: row.owner.clone(),
            beneficiary_id: row.key.clone(),
            name: r.text("name")?,
            location: r.text("location")?,
            homepage: r.text("homepage")?,
            phone: r.text("phone")?,
            email: r.text("email")?,
            social: r.text("social")?,
            percent: r.real("percent")?,
            impact: r.real("impact")?,
            frequency: r.count("frequency")?,
            kind: r.integer("kind")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn row_mapping() {
        let mut allocation = Allocation::new(OwnerId::new("u1"), "12-3456789", "Food Bank").with_percent(0.4);
        allocation.impact = 12.5;
        allocation.frequency = 3;
        let row = allocation.to_row();
        assert_eq!(row.key, "12-3456789");
        assert_eq!(Allocation::from_row(&row).unwrap(), allocation);
    }

    #[test]
    fn rejects_negative_frequency() {
        let row = Allocation::new(OwnerId::new("u1"), "b", "B")
            .to_row()
            .with("frequency", -2i64);
        assert!(matches!(Allocation::from_row(&row), Err(StoreError::InvalidRow { .. })));
    }
}
