//! # Givetrack Service
//!
//! Domain actions for the Givetrack donation tracker.
//!
//! This crate provides:
//! - Action handlers: add and remove beneficiaries, commit transaction
//!   batches, reverse history entries, reset collections, delete accounts
//! - Interactive share adjustment through the calibrator
//! - Collaborator traits for contact lookup, directory search and refresh
//!   signals
//! - A dispatcher with one serial work queue per owner
//!
//! ## Key Invariants
//!
//! - Every mutation is mirrored to both stores through the sync engine
//! - Allocation shares are recalibrated after every structural change
//! - History times are unique per owner and follow the schedule anchor
//! - At most one request per owner is in flight
//! - Collaborator failures are logged, never propagated

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collaborators;
mod config;
mod error;
mod handlers;
mod worker;

pub use collaborators::{
    CollaboratorError, ContactDetails, ContactLookup, Directory, EmptyDirectory, NoContacts,
    RefreshNotifier, SilentNotifier,
};
pub use config::{ServiceConfig, DEFAULT_WORKER_IDLE_TIMEOUT};
pub use error::{ServiceError, ServiceResult};
pub use handlers::{Action, ActionHandlers, Adjustment, Entities, Request};
pub use worker::{DispatchStats, Dispatcher};
