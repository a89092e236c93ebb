//! Output formatting for query results.
//!
//! - [`terminal`] - Indented tree and JSON output for the command line

mod terminal;

pub use terminal::{render_json, render_tree};
