//! # NukeKV
//!
//! An in-memory, persistent key-value store with:
//! - Native JSON document support (path access, filtered query/update/delete)
//! - LRU eviction and TTL expiry
//! - Length-prefixed binary TCP protocol (nuke-wire)
//! - Whole-store JSON snapshot persistence
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │            (accept loop, thread per connection)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ framed command text
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Parser + Dispatch                           │
//! │          (bounded task queue, N worker threads)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Handlers  │          │    Store    │
//!   │  (per-cmd)  │─────────▶│  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Snapshot   │
//!                           │ (nukekv.db) │
//!                           └─────────────┘
//! ```
//!
//! A background manager thread sweeps expired keys once per second and
//! writes a snapshot whenever the dirty-operation counter crosses the
//! configured batch size.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod json;
pub mod store;
pub mod dispatch;
pub mod persistence;
pub mod background;
pub mod network;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{NukeError, Result};
pub use config::Config;
pub use engine::Engine;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of NukeKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
