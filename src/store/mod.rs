//! Store Module
//!
//! The concurrent in-memory core: the value map, the TTL map, the LRU list
//! and its key index, the memory estimate, and the dirty-operation counter.
//!
//! ## Invariants
//! - The key sets of the value map, the LRU index, and the LRU list are
//!   identical whenever the write lock is released.
//! - Every key in the TTL map exists in the value map.
//! - The memory estimate equals the sum of `len(key) + len(value)` over all
//!   stored pairs after any completed operation.
//!
//! ## Concurrency
//! One `parking_lot::RwLock` guards all of it. Reads take the shared lock;
//! every mutation, including LRU promotion on read, takes the exclusive
//! lock. The background sweeper only ever uses `try_write` so it can never
//! stall foreground commands.

mod lru;
mod table;

pub use lru::LruList;
pub use table::{now_ms, IncrError, MutateOutcome, MutateResult, Store, SweepStats, TtlStatus};
