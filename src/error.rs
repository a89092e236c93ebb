//! Error kinds reported by the IPAM core.

use thiserror::Error;

/// Result alias used across the store, hierarchy and allocation code.
pub type IpamResult<T> = Result<T, IpamError>;

#[derive(Error, Debug)]
pub enum IpamError {
    /// Malformed CIDR text, prefix out of range, or host bits set.
    #[error("Invalid network description: {0}")]
    InvalidNetworkDescription(String),

    /// A well-formed request that cannot be honoured as asked.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No free /{prefix_len} block available in {parent}")]
    NoMatchingGapAvailable { parent: String, prefix_len: u8 },

    #[error("Network {0} is not in the database")]
    NetworkNotInDatabase(String),

    #[error("Tag '{name}' already exists on {network}")]
    TagExists { network: String, name: String },

    #[error("Tag '{name}' does not exist on {network}")]
    TagDoesNotExist { network: String, name: String },

    /// Lost a race for the same block; the caller may retry.
    #[error("Conflict: {0} is already registered")]
    Conflict(String),

    #[error("Network store is closed")]
    StoreClosed,

    #[error("Corrupt database snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IpamError {
    /// Only a lost claim race is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IpamError::Conflict(_))
    }
}
