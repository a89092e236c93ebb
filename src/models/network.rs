//! Claimed network and containment tree models.

use super::Ipv4;
use serde::{Deserialize, Serialize};

/// A claimed CIDR block as stored in the network store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Persisted identity, used as the tag foreign key.
    pub id: u64,
    /// The block itself; `(address, prefix_len)` is unique.
    pub cidr: Ipv4,
}

impl Network {
    pub fn address(&self) -> u64 {
        self.cidr.network_address()
    }

    pub fn prefix_len(&self) -> u8 {
        self.cidr.mask
    }
}

/// One node of a containment tree built per query.
///
/// `registered` is false for a synthesized root that is not itself stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainmentNode {
    pub cidr: Ipv4,
    pub registered: bool,
    /// Direct children in address order.
    pub children: Vec<ContainmentNode>,
}

impl ContainmentNode {
    pub fn new(cidr: Ipv4, registered: bool) -> ContainmentNode {
        ContainmentNode {
            cidr,
            registered,
            children: Vec::new(),
        }
    }

    /// Number of levels below this node.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// All blocks of the tree in pre-order, this node included.
    pub fn flatten(&self) -> Vec<Ipv4> {
        let mut out = vec![self.cidr];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}
