//! # Givetrack Testkit
//!
//! Test utilities for Givetrack.
//!
//! This crate provides:
//! - Fixtures for owners, profiles, allocations and history
//! - Temporary memory and file stores with automatic cleanup
//! - A remote store stand-in that can go offline or slow down
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use givetrack_testkit::prelude::*;
//!
//! #[test]
//! fn offline_remote() {
//!     let remote = FlakyStore::new();
//!     remote.set_online(false);
//!     // ... exercise the engine against `remote`
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod flaky;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::flaky::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use flaky::*;
pub use generators::*;
