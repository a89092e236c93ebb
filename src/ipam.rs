//! Service boundary of the address-space manager.
//!
//! [`Ipam`] takes CIDR text from callers, parses it once before touching the
//! store, and runs each operation as a single store read or transaction.

use crate::error::IpamResult;
use crate::models::{ContainmentNode, Ipv4};
use crate::processing::{build_tree, claim, depth_limit, get_tree};
use crate::store::NetworkStore;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Ipam {
    store: Arc<NetworkStore>,
}

impl Ipam {
    pub fn new(store: Arc<NetworkStore>) -> Ipam {
        Ipam { store }
    }

    pub fn store(&self) -> &Arc<NetworkStore> {
        &self.store
    }

    /// Containment tree below `net`; a negative `depth` means unlimited.
    pub fn get_net(&self, net: &str, depth: i64) -> IpamResult<ContainmentNode> {
        let block = Ipv4::parse_network(net)?;
        get_tree(&self.store, block, depth_limit(depth))
    }

    /// Register `net`; already registered blocks are left alone.
    pub fn add_net(&self, net: &str) -> IpamResult<()> {
        let block = Ipv4::parse_network(net)?;
        self.store.register(block)?;
        Ok(())
    }

    /// Remove `net`, or every stored block inside it when `recursive`.
    pub fn delete_net(&self, net: &str, recursive: bool) -> IpamResult<()> {
        let block = Ipv4::parse_network(net)?;
        let removed = self.store.remove(block, recursive)?;
        log::info!(
            "delete_net {block} recursive={recursive}: removed {} networks",
            removed.len()
        );
        Ok(())
    }

    /// Claim a free `/prefix_len` directly under `net` and return it.
    pub fn claim_net(&self, net: &str, prefix_len: u8) -> IpamResult<ContainmentNode> {
        let parent = Ipv4::parse_network(net)?;
        self.store.write(|state| {
            let network = claim(state, parent, prefix_len)?;
            Ok(build_tree(state, network.cidr, Some(0)))
        })
    }

    pub fn add_tag(&self, net: &str, name: &str, value: &str) -> IpamResult<()> {
        let block = Ipv4::parse_network(net)?;
        self.store.write(|state| state.add_tag(&block, name, value))
    }

    /// Delete a tag; a missing tag is not an error.
    pub fn delete_tag(&self, net: &str, name: &str) -> IpamResult<Option<String>> {
        let block = Ipv4::parse_network(net)?;
        self.store.write(|state| Ok(state.delete_tag(&block, name)))
    }

    pub fn modify_tag(&self, net: &str, name: &str, value: &str) -> IpamResult<()> {
        let block = Ipv4::parse_network(net)?;
        self.store
            .write(|state| state.modify_tag(&block, name, value))
    }

    pub fn get_tag(&self, net: &str, name: &str) -> IpamResult<String> {
        let block = Ipv4::parse_network(net)?;
        self.store.read(|state| state.get_tag(&block, name))?
    }

    pub fn get_tags(&self, net: &str) -> IpamResult<BTreeMap<String, String>> {
        let block = Ipv4::parse_network(net)?;
        self.store.read(|state| state.get_tags(&block))
    }
}
