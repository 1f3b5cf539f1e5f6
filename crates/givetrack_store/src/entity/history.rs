//! Transaction history.

use crate::entity::Record;
use crate::error::StoreResult;
use crate::types::{Collection, OwnerId};
use crate::value::Row;

/// An immutable snapshot of one completed transaction.
///
/// `time` is strictly increasing and unique per owner; it is the row key.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Owning identity.
    pub owner: OwnerId,
    /// Schedule time; the row key.
    pub time: i64,
    /// Beneficiary the amount went to.
    pub beneficiary_id: String,
    /// Beneficiary display name at commit time.
    pub name: String,
    /// Amount given.
    pub amount: f64,
    /// Wall-clock creation time.
    pub stamp: i64,
}

impl HistoryEntry {
    /// Creates an entry.
    pub fn new(
        owner: OwnerId,
        time: i64,
        beneficiary_id: impl Into<String>,
        name: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            owner,
            time,
            beneficiary_id: beneficiary_id.into(),
            name: name.into(),
            amount,
            stamp: 0,
        }
    }
}

impl Record for HistoryEntry {
    const COLLECTION: Collection = Collection::History;
    const FIELDS: &'static [&'static str] = &["time", "beneficiary_id", "name", "amount", "stamp"];

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn key(&self) -> String {
        self.time.to_string()
    }

    fn to_row(&self) -> Row {
        Row::new(self.owner.clone(), self.key())
            .with("time", self.time)
            .with("beneficiary_id", self.beneficiary_id.as_str())
            .with("name", self.name.as_str())
            .with("amount", self.amount)
            .with("stamp", self.stamp)
    }

    fn from_row(row: &Row) -> StoreResult<Self> {
        let r = row.reader(Collection::History);
        Ok(Self {
            owner: row.owner.clone(),
            time: r.integer("time")?,
            beneficiary_id: r.text("beneficiary_id")?,
            name: r.text("name")?,
            amount: r.real("amount")?,
            stamp: r.integer("stamp")?,
        })
    }
}
