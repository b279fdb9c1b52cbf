//! Engine Module
//!
//! The coordinator that wires the pieces together.
//!
//! ## Responsibilities
//! - Build the store and load the snapshot on open
//! - Own the worker pool and the background manager
//! - Hand dispatch receivers to connection handlers
//! - Run the shutdown drain: stop the sweeper, drain the workers, final save
//!
//! ## Startup order
//! store → snapshot load → worker pool → background manager. Shutdown is
//! the reverse, finishing with a snapshot if anything is unsaved.

use std::sync::Arc;

use crossbeam::channel::Receiver;

use crate::background::BackgroundManager;
use crate::config::Config;
use crate::dispatch::{Reply, WorkerPool};
use crate::error::Result;
use crate::persistence;
use crate::store::Store;

/// The running database engine
pub struct Engine {
    config: Config,
    store: Arc<Store>,
    pool: WorkerPool,
    background: BackgroundManager,
}

impl Engine {
    /// Bring up a full engine from a config
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(Store::new(&config));

        if config.persistence_enabled {
            match persistence::load(&config.database_path) {
                Ok(snapshot) => {
                    let loaded = store.load_snapshot(snapshot);
                    if loaded > 0 {
                        tracing::info!(keys = loaded, "loaded snapshot");
                    } else {
                        tracing::info!("database file not found or empty, starting fresh");
                    }
                }
                Err(e) => {
                    // A corrupt snapshot is not fatal; serve an empty store.
                    tracing::error!(error = %e, "could not parse database file, starting empty");
                }
            }
        }

        let pool = WorkerPool::start(Arc::clone(&store), config.effective_workers())?;
        let background = BackgroundManager::start(Arc::clone(&store))?;

        Ok(Self {
            config,
            store,
            pool,
            background,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Queue a command for a worker; the caller blocks on the receiver
    pub fn dispatch(&self, command: String, args: Vec<String>) -> Receiver<Reply> {
        self.pool.dispatch(command, args)
    }

    /// Graceful drain: background manager first, then the worker pool (all
    /// queued tasks complete), then a final snapshot if the dirty counter
    /// is nonzero.
    pub fn close(&self) {
        self.background.stop();
        self.pool.shutdown();

        let unsaved = self.store.dirty_ops();
        if unsaved > 0 && self.store.persistence_enabled() {
            tracing::info!(operations = unsaved, "performing final save");
            if !self.store.final_save() {
                tracing::error!("final save failed; unsaved operations remain");
            }
        }
    }
}
