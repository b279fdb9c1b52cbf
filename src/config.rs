//! Configuration for NukeKV
//!
//! Centralized configuration with sensible defaults. All values are read
//! once at startup; the two runtime-mutable tunables (`debug_mode` and
//! `batch_processing_size`) seed atomics owned by the store.

use std::path::PathBuf;

use crate::error::{NukeError, Result};

/// Hard cap on a single nuke-wire frame body (1 GiB). A header declaring
/// more than this closes the connection without a reply.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// Per-value cap (512 MiB), enforced by SET/UPDATE/JSON.SET.
pub const MAX_VALUE_SIZE: u64 = 512 * 1024 * 1024;

/// Main configuration for a NukeKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen port
    pub port: u16,

    /// Bind address (without port)
    pub bind: String,

    /// Largest frame body the transport will accept
    pub max_payload_size: u64,

    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Whether snapshots are written at all
    pub persistence_enabled: bool,

    /// Snapshot file path
    pub database_path: PathBuf,

    /// Dirty-op threshold that triggers a batched snapshot.
    /// 0 means write-through: every mutating command saves synchronously.
    pub batch_processing_size: u64,

    // -------------------------------------------------------------------------
    // Memory / Cache Configuration
    // -------------------------------------------------------------------------
    /// Whether LRU promotion and eviction run at all
    pub caching_enabled: bool,

    /// Memory budget for stored pairs; 0 = unlimited
    pub max_memory_bytes: u64,

    // -------------------------------------------------------------------------
    // Worker Configuration
    // -------------------------------------------------------------------------
    /// Worker thread count; 0 = auto (hardware threads - 1, min 1)
    pub worker_threads: usize,

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------
    /// When on, each reply carries a ` (<duration>)` suffix
    pub debug_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind: "0.0.0.0".to_string(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            persistence_enabled: true,
            database_path: PathBuf::from("nukekv.db"),
            batch_processing_size: 1,
            caching_enabled: true,
            max_memory_bytes: 0,
            worker_threads: 0,
            debug_mode: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full listen address (`bind:port`)
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Resolve the effective worker count (0 = auto)
    pub fn effective_workers(&self) -> usize {
        if self.worker_threads > 0 {
            self.worker_threads
        } else {
            let hw = std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(2);
            hw.saturating_sub(1).max(1)
        }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.max_payload_size == 0 {
            return Err(NukeError::Config(
                "max_payload_size must be greater than 0".to_string(),
            ));
        }
        if self.persistence_enabled && self.database_path.as_os_str().is_empty() {
            return Err(NukeError::Config(
                "database_path must not be empty when persistence is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.config.bind = bind.into();
        self
    }

    pub fn max_payload_size(mut self, bytes: u64) -> Self {
        self.config.max_payload_size = bytes;
        self
    }

    pub fn persistence_enabled(mut self, enabled: bool) -> Self {
        self.config.persistence_enabled = enabled;
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn batch_processing_size(mut self, size: u64) -> Self {
        self.config.batch_processing_size = size;
        self
    }

    pub fn caching_enabled(mut self, enabled: bool) -> Self {
        self.config.caching_enabled = enabled;
        self
    }

    pub fn max_memory_bytes(mut self, bytes: u64) -> Self {
        self.config.max_memory_bytes = bytes;
        self
    }

    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    pub fn debug_mode(mut self, on: bool) -> Self {
        self.config.debug_mode = on;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
