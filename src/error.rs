//! Error types for NukeKV
//!
//! Provides a unified error type for infrastructure failures. Command-level
//! failures (bad arity, wrong type, missing key) are not errors; they are
//! [`Reply`](crate::dispatch::Reply) values delivered to the client.

use thiserror::Error;

/// Result type alias using NukeError
pub type Result<T> = std::result::Result<T, NukeError>;

/// Unified error type for NukeKV operations
#[derive(Debug, Error)]
pub enum NukeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    #[error("Persistence error: {0}")]
    Persistence(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
