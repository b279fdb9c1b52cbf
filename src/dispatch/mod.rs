//! Dispatch Module
//!
//! Everything between a parsed argv and a reply: the command table, one
//! handler per command, the self-benchmark, and the worker pool that drains
//! the task queue.
//!
//! Handlers return a [`Reply`] — status code plus text. Status codes never
//! reach the wire; clients only see the text. Nothing a handler does can
//! tear down a worker: panics are caught at the worker boundary and become
//! 500-class replies.

mod handlers;
mod pool;
mod stress;

pub use handlers::{execute, CommandKind, Reply, StatusCode};
pub use pool::{Task, WorkerPool};
pub use stress::{format_duration, format_memory_size};
