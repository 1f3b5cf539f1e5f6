//! Reconcile command implementation.

use super::Stores;
use givetrack_store::Collection;
use givetrack_sync_engine::{ReconcileStatus, Reconciliation};
use serde::Serialize;

/// One reconciled collection.
#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    /// Collection name.
    pub collection: String,
    /// Chosen direction.
    pub direction: String,
    /// Local stamp before the pass.
    pub local_stamp: i64,
    /// Remote stamp before the pass.
    pub remote_stamp: i64,
    /// Rows copied.
    pub rows: usize,
    /// Reason the pass was degraded, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl From<&Reconciliation> for ReconcileReport {
    fn from(r: &Reconciliation) -> Self {
        Self {
            collection: r.collection.to_string(),
            direction: r.direction.to_string(),
            local_stamp: r.local_stamp,
            remote_stamp: r.remote_stamp,
            rows: r.rows,
            degraded: match &r.status {
                ReconcileStatus::Applied => None,
                ReconcileStatus::Degraded(reason) => Some(reason.clone()),
            },
        }
    }
}

/// Runs the reconcile command.
pub fn run(stores: &Stores, collection: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = stores.handlers.engine();
    let results = match collection {
        Some(name) => {
            let collection: Collection = name.parse()?;
            vec![engine.reconcile(&stores.owner, collection)?]
        }
        None => engine.reconcile_all(&stores.owner)?,
    };
    let reports: Vec<ReconcileReport> = results.iter().map(ReconcileReport::from).collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        _ => {
            for report in &reports {
                print!(
                    "{:<14} {:<12} local={} remote={} rows={}",
                    report.collection, report.direction, report.local_stamp, report.remote_stamp, report.rows
                );
                match &report.degraded {
                    Some(reason) => println!(" degraded: {reason}"),
                    None => println!(),
                }
            }
        }
    }
    Ok(())
}
