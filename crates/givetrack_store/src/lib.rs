//! # Givetrack Store
//!
//! Entity model and store adapters for Givetrack.
//!
//! This crate provides:
//! - Typed entities (`Profile`, `Allocation`, `HistoryEntry`, `SearchResult`)
//!   with explicit field lists and pure row mappings
//! - The `EntityStore` adapter trait shared by the device and cloud stores
//! - Table stamps kept on the owner's Profile row
//! - `MemoryStore` for tests and simulations
//! - `FileStore`, a locked, snapshot-on-write persistent store
//!
//! ## Key Invariants
//!
//! - Every row carries its owner; owners never see each other's rows
//! - Rows are replaced by `(owner, key)` identity
//! - A stamp write never creates a Profile row
//!
//! Stores hold rows only. Reconciliation between stores lives in
//! `givetrack_sync_engine`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod entity;
mod error;
mod file;
mod memory;
mod typed;
mod types;
mod value;

pub use backend::EntityStore;
pub use entity::{
    Allocation, HistoryEntry, Profile, Record, RoundingPolicy, ScheduleMode, SearchPreferences,
    SearchResult,
};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use typed::Table;
pub use types::{Collection, Filter, OwnerId};
pub use value::{Row, RowReader, Value};
