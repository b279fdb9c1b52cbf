//! Background Manager
//!
//! One thread, one tick per second. Each tick tries the store's write lock;
//! if a foreground command holds it the whole tick is skipped, so the
//! sweeper can never stall live traffic. A held tick sweeps past-deadline
//! keys and writes a snapshot when the dirty counter has reached the batch
//! threshold. Expiry is therefore eventually consistent within about one
//! second, which is the contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::store::Store;

/// Handle to the sweeper thread
pub struct BackgroundManager {
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundManager {
    /// Spawn the manager thread
    pub fn start(store: Arc<Store>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("nukekv-background".to_string())
            .spawn(move || run(store, thread_stop))?;

        Ok(Self {
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Signal the thread and wait for it to finish its current tick
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("background manager thread panicked");
            }
        }
    }
}

fn run(store: Arc<Store>, stop: Arc<AtomicBool>) {
    tracing::debug!("background manager started");

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_secs(1));
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let stats = match store.sweep_and_save() {
            Some(stats) => stats,
            None => continue, // lock contended, skip this tick
        };

        if stats.expired > 0 {
            tracing::debug!(count = stats.expired, "expired keys removed");
        }
        if stats.saved {
            tracing::debug!("batched snapshot written");
        }
    }

    tracing::debug!("background manager stopped");
}
