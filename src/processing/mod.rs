//! Network hierarchy and allocation logic.
//!
//! This module contains the algorithms that work on stored networks:
//! - [`hierarchy`] - Reconstructing the containment tree of a block
//! - [`gap_finder`] - Finding free gaps and claiming the best-fitting one

mod gap_finder;
mod hierarchy;

// Re-export public functions
pub use gap_finder::{best_fit, claim, find_gaps, Gap};
pub use hierarchy::{build_tree, depth_limit, get_tree};
