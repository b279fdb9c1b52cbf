//! Protocol Module
//!
//! The nuke-wire framing and the command-line tokenizer.
//!
//! ## Wire Format
//!
//! ```text
//! ┌───────────────────┬─────────────────────────────┐
//! │ Length (8, BE)    │         Body (UTF-8)        │
//! └───────────────────┴─────────────────────────────┘
//! ```
//!
//! Both directions carry the same frame shape: an 8-byte big-endian unsigned
//! length followed by exactly that many body bytes. Request bodies are
//! command text; reply bodies are reply text. A header that declares a body
//! larger than the configured cap terminates the connection without a reply.

mod codec;
mod parser;

pub use codec::{read_message, write_message, HEADER_SIZE};
pub use parser::parse_command_line;
