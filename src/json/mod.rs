//! JSON Module
//!
//! The document algebra behind the JSON.* commands: path resolution and
//! mutation over parsed documents, and the whole-word recursive search.
//!
//! Paths come in two interchangeable surface forms:
//!
//! ```text
//! a.b[0].c         dotted/bracketed
//! $.a.b[0].c       rooted
//! $[0]             rooted, array document
//! $                whole document
//! ```
//!
//! Both canonicalize to the same token sequence. A token indexes an array
//! or names an object field depending on the container it is applied to,
//! exactly like a JSON Pointer reference token.

mod path;
mod search;

pub use path::{clean_path, delete, get, parse_path, set};
pub use search::contains_word;
