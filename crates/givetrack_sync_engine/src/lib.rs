//! # Givetrack Sync Engine
//!
//! Reconciliation between the device store and the cloud store.
//!
//! This crate provides:
//! - Table-stamp comparison and the pull/push decision per collection
//! - Whole-collection pull and push between the two stores
//! - Mirrored writes that stamp both stores with one fresh stamp
//! - Bounded remote reads with an explicit timed-out outcome
//!
//! ## Architecture
//!
//! Every synchronized collection (Profile, Allocation, History) has a
//! **table stamp** on the owner's Profile row in each store. The newer stamp
//! wins and its whole collection replaces the other side. SearchResult is
//! local only and never compared.
//!
//! ## Key Invariants
//!
//! - Last writer wins per collection, keyed by table stamp
//! - On equal non-zero Profile stamps, the local profile is pushed
//! - A Profile delete never rewrites a stamp
//! - Stamps issued by one engine strictly increase
//! - Remote write failures are not retried; the next reconciliation repairs them
//! - A remote read never blocks longer than the configured timeout

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod decision;
mod engine;
mod error;
mod remote;

pub use clock::{system_millis, StampClock, TimeSource};
pub use config::{SyncConfig, DEFAULT_REMOTE_READ_TIMEOUT};
pub use decision::{decide, Direction, ReconcileStatus, Reconciliation};
pub use engine::{SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use remote::{bounded_read, RemoteRead};
