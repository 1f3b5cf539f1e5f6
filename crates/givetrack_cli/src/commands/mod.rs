//! CLI command implementations.

pub mod account;
pub mod calibrate;
pub mod inspect;
pub mod reconcile;

use givetrack_service::{ActionHandlers, ServiceConfig};
use givetrack_store::{FileStore, OwnerId};
use givetrack_sync_engine::SyncEngine;
use std::path::PathBuf;
use std::sync::Arc;

/// Device and cloud stores opened for one owner.
pub struct Stores {
    /// Owner the command acts for.
    pub owner: OwnerId,
    /// Handlers over both stores.
    pub handlers: ActionHandlers,
}

impl Stores {
    /// Opens both stores and builds the handlers.
    pub fn open(
        local: &Option<PathBuf>,
        remote: &Option<PathBuf>,
        owner: &Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let local = local.as_ref().ok_or("Device store path required")?;
        let remote = remote.as_ref().ok_or("Cloud store path required")?;
        let owner = owner.as_deref().ok_or("Owner required")?;

        let config = ServiceConfig::default();
        let engine = SyncEngine::new(
            config.sync.clone(),
            Arc::new(FileStore::open(local)?),
            Arc::new(FileStore::open(remote)?),
        );
        let handlers = ActionHandlers::new(config, Arc::new(engine))?;
        tracing::debug!(local = %local.display(), remote = %remote.display(), owner, "opened stores");
        Ok(Self {
            owner: OwnerId::new(owner),
            handlers,
        })
    }
}
