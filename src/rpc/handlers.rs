//! Request dispatch onto [`Ipam`].

use super::protocol::{
    decode_params, ClaimNetParams, DeleteNetParams, GetNetParams, NetParams, Request, Response,
    TagParams, TagValueParams, METHODS,
};
use crate::fault::Fault;
use crate::ipam::Ipam;
use serde::Serialize;
use serde_json::Value;

/// Run one request to completion. Never panics on bad input.
pub fn dispatch(ipam: &Ipam, request: Request) -> Response {
    let Request { id, method, params } = request;
    log::debug!("rpc #{id} {method} {params}");

    match call(ipam, &method, params) {
        Ok(result) => Response::ok(id, result),
        Err(fault) => {
            if fault.is_retryable() {
                log::warn!("rpc #{id} {method} lost a race: {fault}");
            } else {
                log::info!("rpc #{id} {method} failed: {fault}");
            }
            Response::fault(id, fault)
        }
    }
}

fn call(ipam: &Ipam, method: &str, params: Value) -> Result<Value, Fault> {
    match method {
        "list_methods" => to_value(METHODS),
        "get_net" => {
            let p: GetNetParams = decode_params(method, params)?;
            to_value(ipam.get_net(&p.net, p.depth)?)
        }
        "add_net" => {
            let p: NetParams = decode_params(method, params)?;
            to_value(ipam.add_net(&p.net)?)
        }
        "delete_net" => {
            let p: DeleteNetParams = decode_params(method, params)?;
            to_value(ipam.delete_net(&p.net, p.recursive)?)
        }
        "claim_net" => {
            let p: ClaimNetParams = decode_params(method, params)?;
            to_value(ipam.claim_net(&p.net, p.prefix_len)?)
        }
        "add_tag" => {
            let p: TagValueParams = decode_params(method, params)?;
            to_value(ipam.add_tag(&p.net, &p.name, &p.value)?)
        }
        "delete_tag" => {
            let p: TagParams = decode_params(method, params)?;
            to_value(ipam.delete_tag(&p.net, &p.name)?)
        }
        "modify_tag" => {
            let p: TagValueParams = decode_params(method, params)?;
            to_value(ipam.modify_tag(&p.net, &p.name, &p.value)?)
        }
        "get_tag" => {
            let p: TagParams = decode_params(method, params)?;
            to_value(ipam.get_tag(&p.net, &p.name)?)
        }
        "get_tags" => {
            let p: NetParams = decode_params(method, params)?;
            to_value(ipam.get_tags(&p.net)?)
        }
        _ => Err(Fault::invalid_request(format!("unknown method '{method}'"))),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, Fault> {
    serde_json::to_value(value)
        .map_err(|e| Fault::from_code(crate::fault::STORAGE_ERROR, format!("encode result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NetworkStore;
    use serde_json::json;
    use std::sync::Arc;

    fn request(id: u64, method: &str, params: Value) -> Request {
        Request {
            id,
            method: method.to_string(),
            params,
        }
    }

    fn ipam() -> Ipam {
        Ipam::new(Arc::new(NetworkStore::in_memory()))
    }

    #[test]
    fn test_add_and_get_net() {
        let ipam = ipam();
        let response = dispatch(&ipam, request(1, "add_net", json!({"net": "127.0.0.0/8"})));
        assert_eq!(response, Response::ok(1, Value::Null));

        let response = dispatch(&ipam, request(2, "get_net", json!({"net": "127.0.0.0/8"})));
        assert_eq!(response.id, 2);
        let tree = response.into_result().unwrap();
        assert_eq!(tree["cidr"], "127.0.0.0/8");
        assert_eq!(tree["registered"], true);
    }

    #[test]
    fn test_claim_net_faults() {
        let ipam = ipam();
        dispatch(&ipam, request(1, "add_net", json!({"net": "127.0.0.0/9"})));
        dispatch(&ipam, request(2, "add_net", json!({"net": "127.128.0.0/9"})));
        let fault = dispatch(
            &ipam,
            request(3, "claim_net", json!({"net": "127.0.0.0/8", "prefix_len": 16})),
        )
        .into_result()
        .unwrap_err();
        assert_eq!(fault.code, crate::fault::NO_MATCHING_GAP_AVAILABLE);
        assert_eq!(fault.name, "NoMatchingGapAvailable");

        let fault = dispatch(
            &ipam,
            request(4, "claim_net", json!({"net": "127.0.0.1/8", "prefix_len": 16})),
        )
        .into_result()
        .unwrap_err();
        assert_eq!(fault.name, "InvalidNetworkDescription");
    }

    #[test]
    fn test_tags_roundtrip_through_dispatch() {
        let ipam = ipam();
        dispatch(&ipam, request(1, "add_net", json!({"net": "127.0.0.0/8"})));
        let params = json!({"net": "127.0.0.0/8", "name": "name", "value": "localhost"});
        assert!(dispatch(&ipam, request(2, "add_tag", params.clone()))
            .into_result()
            .is_ok());
        let fault = dispatch(&ipam, request(3, "add_tag", params))
            .into_result()
            .unwrap_err();
        assert_eq!(fault.name, "TagExists");

        let tags = dispatch(&ipam, request(4, "get_tags", json!({"net": "127.0.0.0/8"})))
            .into_result()
            .unwrap();
        assert_eq!(tags, json!({"name": "localhost"}));

        let fault = dispatch(
            &ipam,
            request(5, "get_tag", json!({"net": "127.0.0.0/8", "name": "vlan"})),
        )
        .into_result()
        .unwrap_err();
        assert_eq!(fault.name, "TagDoesNotExist");
    }

    #[test]
    fn test_unknown_method_and_bad_params() {
        let ipam = ipam();
        let fault = dispatch(&ipam, request(1, "drop_tables", Value::Null))
            .into_result()
            .unwrap_err();
        assert_eq!(fault.name, "InvalidRequest");

        let fault = dispatch(&ipam, request(2, "add_net", json!({"cidr": "10.0.0.0/8"})))
            .into_result()
            .unwrap_err();
        assert_eq!(fault.name, "InvalidRequest");
    }

    #[test]
    fn test_list_methods() {
        let methods = dispatch(&ipam(), request(1, "list_methods", Value::Null))
            .into_result()
            .unwrap();
        assert_eq!(methods.as_array().unwrap().len(), METHODS.len());
    }
}
