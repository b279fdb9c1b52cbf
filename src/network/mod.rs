//! Network Module
//!
//! TCP accept loop and per-connection handling.
//!
//! ## Architecture
//! - Single acceptor thread, one OS thread per connection
//! - A connection runs one command at a time: read a frame, dispatch,
//!   block on the completion, write the reply frame
//! - Connection threads never touch a store lock; they only talk to the
//!   dispatch queue

mod connection;
mod server;

pub use server::Server;
