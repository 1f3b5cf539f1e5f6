//! Profile and settings.

use crate::entity::Record;
use crate::error::StoreResult;
use crate::types::{Collection, OwnerId};
use crate::value::Row;

/// How committed amounts and running impact are rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingPolicy {
    /// Truncate to whole cents.
    #[default]
    FloorToCent,
    /// Round half away from zero to whole cents.
    RoundToCent,
    /// Keep full precision.
    Unrounded,
}

impl RoundingPolicy {
    /// Applies the policy to an amount.
    #[must_use]
    pub fn apply(self, amount: f64) -> f64 {
        match self {
            RoundingPolicy::FloorToCent => (amount * 100.0).floor() / 100.0,
            RoundingPolicy::RoundToCent => (amount * 100.0).round() / 100.0,
            RoundingPolicy::Unrounded => amount,
        }
    }

    /// Returns the stored code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            RoundingPolicy::FloorToCent => 0,
            RoundingPolicy::RoundToCent => 1,
            RoundingPolicy::Unrounded => 2,
        }
    }

    /// Parses a stored code; unknown codes keep full precision.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => RoundingPolicy::FloorToCent,
            1 => RoundingPolicy::RoundToCent,
            _ => RoundingPolicy::Unrounded,
        }
    }
}

/// How the recurring schedule anchor moves on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    /// The anchor follows the current day.
    #[default]
    Rolling,
    /// The anchor was pinned to a chosen date for the next commit only.
    Pinned,
}

impl ScheduleMode {
    /// Returns the stored code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            ScheduleMode::Rolling => 0,
            ScheduleMode::Pinned => 1,
        }
    }

    /// Parses a stored code.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => ScheduleMode::Pinned,
            _ => ScheduleMode::Rolling,
        }
    }
}

/// Directory search preferences kept on the profile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPreferences {
    /// Free-text term.
    pub term: String,
    /// City filter.
    pub city: String,
    /// State filter.
    pub state: String,
    /// Postal code filter.
    pub zip: String,
    /// Minimum rating filter.
    pub min_rating: String,
    /// Look up a single beneficiary instead of searching.
    pub focus: bool,
    /// Beneficiary looked up when `focus` is set.
    pub beneficiary_id: String,
}

/// The signed-in user's profile, settings and table stamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Owning identity; also the row key.
    pub owner: OwnerId,
    /// Account email.
    pub email: String,
    /// Whether this profile is the active session on this store.
    pub active: bool,
    /// Total split across allocations on each commit.
    pub giving_pool: f64,
    /// Percent step used by interactive adjustment.
    pub step: f64,
    /// Rounding applied on commit.
    pub rounding: RoundingPolicy,
    /// Schedule anchor in epoch milliseconds; history times derive from it.
    pub schedule_anchor: i64,
    /// Schedule mode.
    pub schedule_mode: ScheduleMode,
    /// Search preferences.
    pub search: SearchPreferences,
    /// Last write to the allocation collection.
    pub allocation_stamp: i64,
    /// Last write to the history collection.
    pub history_stamp: i64,
    /// Last write to the profile collection.
    pub profile_stamp: i64,
}

impl Profile {
    /// Creates an active profile with default settings.
    pub fn new(owner: OwnerId, email: impl Into<String>) -> Self {
        Self {
            owner,
            email: email.into(),
            active: true,
            giving_pool: 0.0,
            step: 0.01,
            rounding: RoundingPolicy::default(),
            schedule_anchor: 0,
            schedule_mode: ScheduleMode::default(),
            search: SearchPreferences::default(),
            allocation_stamp: 0,
            history_stamp: 0,
            profile_stamp: 0,
        }
    }

    /// The profile assumed when none can be read: inactive, all stamps zero.
    pub fn inactive_default(owner: OwnerId) -> Self {
        Self {
            active: false,
            ..Self::new(owner, "")
        }
    }

    /// Returns the table stamp kept for `collection` (0 for unsynchronized).
    #[must_use]
    pub fn stamp(&self, collection: Collection) -> i64 {
        match collection {
            Collection::Profile => self.profile_stamp,
            Collection::Allocation => self.allocation_stamp,
            Collection::History => self.history_stamp,
            Collection::SearchResult => 0,
        }
    }

    /// Sets the table stamp kept for `collection`.
    pub fn set_stamp(&mut self, collection: Collection, time: i64) {
        match collection {
            Collection::Profile => self.profile_stamp = time,
            Collection::Allocation => self.allocation_stamp = time,
            Collection::History => self.history_stamp = time,
            Collection::SearchResult => {}
        }
    }
}

impl Record for Profile {
    const COLLECTION: Collection = Collection::Profile;
    const FIELDS: &'static [&'static str] = &[
        "email",
        "active",
        "giving_pool",
        "step",
        "rounding",
        "schedule_anchor",
        "schedule_mode",
        "search_term",
        "search_city",
        "search_state",
        "search_zip",
        "search_min_rating",
        "search_focus",
        "search_beneficiary",
        "allocation_stamp",
        "history_stamp",
        "profile_stamp",
    ];

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn key(&self) -> String {
        self.owner.to_string()
    }

    fn to_row(&self) -> Row {
        Row::new(self.owner.clone(), self.key())
            .with("email", self.email.as_str())
            .with("active", self.active)
            .with("giving_pool", self.giving_pool)
            .with("step", self.step)
            .with("rounding", self.rounding.code())
            .with("schedule_anchor", self.schedule_anchor)
            .with("schedule_mode", self.schedule_mode.code())
            .with("search_term", self.search.term.as_str())
            .with("search_city", self.search.city.as_str())
            .with("search_state", self.search.state.as_str())
            .with("search_zip", self.search.zip.as_str())
            .with("search_min_rating", self.search.min_rating.as_str())
            .with("search_focus", self.search.focus)
            .with("search_beneficiary", self.search.beneficiary_id.as_str())
            .with("allocation_stamp", self.allocation_stamp)
            .with("history_stamp", self.history_stamp)
            .with("profile_stamp", self.profile_stamp)
    }

    fn from_row(row: &Row) -> StoreResult<Self> {
        let r = row.reader(Collection::Profile);
        Ok(Self {
            owner: row.owner.clone(),
            email: r.text("email")?,
            active: r.boolean("active")?,
            giving_pool: r.real("giving_pool")?,
            step: r.real("step")?,
            rounding: RoundingPolicy::from_code(r.integer("rounding")?),
            schedule_anchor: r.integer("schedule_anchor")?,
            schedule_mode: ScheduleMode::from_code(r.integer("schedule_mode")?),
            search: SearchPreferences {
                term: r.text("search_term")?,
                city: r.text("search_city")?,
                state: r.text("search_state")?,
                zip: r.text("search_zip")?,
                min_rating: r.text("search_min_rating")?,
                focus: r.boolean("search_focus")?,
                beneficiary_id: r.text("search_beneficiary")?,
            },
            allocation_stamp: r.integer("allocation_stamp")?,
            history_stamp: r.integer("history_stamp")?,
            profile_stamp: r.integer("profile_stamp")?,
        })
    }
}
