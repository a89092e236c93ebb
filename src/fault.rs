//! Protocol-level fault codes.
//!
//! Maps [`IpamError`] kinds onto the numeric codes and fault strings that
//! callers of the RPC interface see.

use crate::error::IpamError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INVALID_FAULT_CODE: u32 = 1000;
pub const INVALID_NETWORK_DESCRIPTION: u32 = 1001;
pub const NO_MATCHING_GAP_AVAILABLE: u32 = 1002;
pub const NETWORK_NOT_IN_DATABASE: u32 = 1003;
pub const TAG_EXISTS: u32 = 1004;
pub const TAG_DOES_NOT_EXIST: u32 = 1005;
pub const INVALID_REQUEST: u32 = 1006;
pub const CONFLICT: u32 = 1007;
pub const STORAGE_ERROR: u32 = 1008;

/// Fault string for a known code.
pub fn fault_name(code: u32) -> Option<&'static str> {
    let name = match code {
        INVALID_FAULT_CODE => "InvalidFaultCode",
        INVALID_NETWORK_DESCRIPTION => "InvalidNetworkDescription",
        NO_MATCHING_GAP_AVAILABLE => "NoMatchingGapAvailable",
        NETWORK_NOT_IN_DATABASE => "NetworkNotInDatabase",
        TAG_EXISTS => "TagExists",
        TAG_DOES_NOT_EXIST => "TagDoesNotExist",
        INVALID_REQUEST => "InvalidRequest",
        CONFLICT => "Conflict",
        STORAGE_ERROR => "StorageError",
        _ => return None,
    };
    Some(name)
}

#[derive(Error, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[error("{name} ({code}): {message}")]
pub struct Fault {
    pub code: u32,
    /// Stable fault string, e.g. `NoMatchingGapAvailable`.
    pub name: String,
    /// Human readable detail.
    pub message: String,
}

impl Fault {
    /// Fault for `code`; unknown codes become `InvalidFaultCode:<code>`.
    pub fn from_code(code: u32, message: impl Into<String>) -> Fault {
        match fault_name(code) {
            Some(name) => Fault {
                code,
                name: name.to_string(),
                message: message.into(),
            },
            None => Fault {
                code: INVALID_FAULT_CODE,
                name: format!("InvalidFaultCode:{code}"),
                message: message.into(),
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Fault {
        Fault::from_code(INVALID_REQUEST, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code == CONFLICT
    }
}

impl From<&IpamError> for Fault {
    fn from(error: &IpamError) -> Self {
        let code = match error {
            IpamError::InvalidNetworkDescription(_) => INVALID_NETWORK_DESCRIPTION,
            IpamError::InvalidRequest(_) => INVALID_REQUEST,
            IpamError::NoMatchingGapAvailable { .. } => NO_MATCHING_GAP_AVAILABLE,
            IpamError::NetworkNotInDatabase(_) => NETWORK_NOT_IN_DATABASE,
            IpamError::TagExists { .. } => TAG_EXISTS,
            IpamError::TagDoesNotExist { .. } => TAG_DOES_NOT_EXIST,
            IpamError::Conflict(_) => CONFLICT,
            IpamError::StoreClosed
            | IpamError::CorruptSnapshot(_)
            | IpamError::Io(_)
            | IpamError::Serialization(_) => STORAGE_ERROR,
        };
        Fault::from_code(code, error.to_string())
    }
}

impl From<IpamError> for Fault {
    fn from(error: IpamError) -> Self {
        Fault::from(&error)
    }
}
