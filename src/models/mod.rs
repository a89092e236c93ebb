//! Domain models for the address-space manager.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Ipv4`] - IPv4 CIDR block and address arithmetic
//! - [`Network`] - a claimed block as persisted by the store
//! - [`ContainmentNode`] - a node of the containment tree returned by queries

mod ipv4;
mod network;

// Re-export public types
pub use ipv4::{block_size, next_aligned_start, Ipv4, MAX_LENGTH};
pub use network::{ContainmentNode, Network};
