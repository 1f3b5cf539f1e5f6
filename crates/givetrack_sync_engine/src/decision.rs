//! Reconciliation decisions.

use givetrack_store::Collection;
use std::fmt;

/// Which way a reconciliation copies rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Replace the local rows with the remote rows.
    PullRemote,
    /// Replace the remote rows with the local rows.
    PushLocal,
    /// Leave both stores as they are.
    NoOp,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::PullRemote => "pull_remote",
            Direction::PushLocal => "push_local",
            Direction::NoOp => "noop",
        })
    }
}

/// Decides the direction for one collection from its two table stamps.
///
/// The newer stamp wins. On equal non-zero stamps the Profile collection is
/// pushed, so the device that reconciles last owns the active flag. Every
/// other tie is left alone.
#[must_use]
pub fn decide(collection: Collection, local_stamp: i64, remote_stamp: i64) -> Direction {
    if local_stamp < remote_stamp {
        Direction::PullRemote
    } else if local_stamp > remote_stamp {
        Direction::PushLocal
    } else if collection == Collection::Profile && local_stamp != 0 {
        Direction::PushLocal
    } else {
        Direction::NoOp
    }
}

/// Status of a finished reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// Both stores agree on the winning side.
    Applied,
    /// The remote store could not be read or written; stores may diverge
    /// until a later pass.
    Degraded(String),
}

/// Result of reconciling one collection of one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Reconciled collection.
    pub collection: Collection,
    /// Chosen direction.
    pub direction: Direction,
    /// Local table stamp before the pass.
    pub local_stamp: i64,
    /// Remote table stamp before the pass.
    pub remote_stamp: i64,
    /// Number of rows copied.
    pub rows: usize,
    /// Outcome.
    pub status: ReconcileStatus,
}

impl Reconciliation {
    pub(crate) fn degraded(collection: Collection, local_stamp: i64, reason: String) -> Self {
        Self {
            collection,
            direction: Direction::NoOp,
            local_stamp,
            remote_stamp: 0,
            rows: 0,
            status: ReconcileStatus::Degraded(reason),
        }
    }

    /// Returns true if the remote side could not take part.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ReconcileStatus::Degraded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_side_wins() {
        assert_eq!(decide(Collection::Allocation, 100, 200), Direction::PullRemote);
        assert_eq!(decide(Collection::Allocation, 200, 100), Direction::PushLocal);
        assert_eq!(decide(Collection::History, 0, 5), Direction::PullRemote);
    }

    #[test]
    fn equal_stamps() {
        assert_eq!(decide(Collection::Allocation, 100, 100), Direction::NoOp);
        assert_eq!(decide(Collection::History, 0, 0), Direction::NoOp);
        assert_eq!(decide(Collection::Profile, 0, 0), Direction::NoOp);
        assert_eq!(decide(Collection::Profile, 100, 100), Direction::PushLocal);
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::PullRemote.to_string(), "pull_remote");
        assert_eq!(Direction::NoOp.to_string(), "noop");
    }

    #[test]
    fn degraded_is_noop() {
        let r = Reconciliation::degraded(Collection::Allocation, 9, "offline".into());
        assert!(r.is_degraded());
        assert_eq!(r.direction, Direction::NoOp);
        assert_eq!(r.rows, 0);
    }
}
