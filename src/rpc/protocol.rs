//! Wire format: one JSON object per line in each direction.

use crate::fault::Fault;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method names understood by the server, in registration order.
pub const METHODS: &[&str] = &[
    "list_methods",
    "get_net",
    "add_net",
    "delete_net",
    "claim_net",
    "add_tag",
    "delete_tag",
    "modify_tag",
    "get_tag",
    "get_tags",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

impl Response {
    pub fn ok(id: u64, result: Value) -> Response {
        Response {
            id,
            result: Some(result),
            fault: None,
        }
    }

    pub fn fault(id: u64, fault: Fault) -> Response {
        Response {
            id,
            result: None,
            fault: Some(fault),
        }
    }

    /// The call outcome; a response with neither field is a `null` result.
    pub fn into_result(self) -> Result<Value, Fault> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

fn default_depth() -> i64 {
    -1
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NetParams {
    pub net: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GetNetParams {
    pub net: String,
    #[serde(default = "default_depth")]
    pub depth: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteNetParams {
    pub net: String,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClaimNetParams {
    pub net: String,
    pub prefix_len: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TagParams {
    pub net: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TagValueParams {
    pub net: String,
    pub name: String,
    pub value: String,
}

/// Decode `params`, reporting the offending field on failure.
pub fn decode_params<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, Fault> {
    serde_path_to_error::deserialize(params).map_err(|e| {
        Fault::invalid_request(format!(
            "bad params for {method}: path={} error={}",
            e.path(),
            e.inner()
        ))
    })
}
