//! In-memory contents of the network store.
//!
//! [`StoreState`] is what a transaction sees. It is only reachable through
//! [`super::NetworkStore::read`] and [`super::NetworkStore::write`], so every
//! mutation below runs under the store lock.

use crate::error::{IpamError, IpamResult};
use crate::models::{Ipv4, Network, MAX_LENGTH};
use std::collections::BTreeMap;

/// Key ordering is address ascending, then prefix length ascending.
pub(crate) type NetworkKey = (u64, u8);

pub(crate) fn key_of(cidr: &Ipv4) -> NetworkKey {
    (cidr.network_address(), cidr.mask)
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) networks: BTreeMap<NetworkKey, Network>,
    /// `(network_id, name) -> value`
    pub(crate) tags: BTreeMap<(u64, String), String>,
    pub(crate) next_id: u64,
    /// Bumped by every mutation; used to skip no-op snapshot writes.
    pub(crate) revision: u64,
}

impl StoreState {
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn get(&self, cidr: &Ipv4) -> Option<&Network> {
        self.networks.get(&key_of(cidr))
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    /// Idempotent insert. Returns the stored row and whether it was new.
    pub fn register(&mut self, cidr: Ipv4) -> (Network, bool) {
        if let Some(existing) = self.get(&cidr) {
            return (existing.clone(), false);
        }
        (self.insert_row(cidr), true)
    }

    /// Strict insert; an already present block is a [`IpamError::Conflict`].
    pub fn insert_new(&mut self, cidr: Ipv4) -> IpamResult<Network> {
        if self.get(&cidr).is_some() {
            return Err(IpamError::Conflict(cidr.to_string()));
        }
        Ok(self.insert_row(cidr))
    }

    fn insert_row(&mut self, cidr: Ipv4) -> Network {
        self.next_id += 1;
        let network = Network {
            id: self.next_id,
            cidr,
        };
        self.networks.insert(key_of(&cidr), network.clone());
        self.revision += 1;
        network
    }

    /// Remove `cidr`, or everything inside it when `recursive`.
    ///
    /// Tags of removed networks go with them. Returns the removed rows.
    pub fn remove(&mut self, cidr: &Ipv4, recursive: bool) -> Vec<Network> {
        let removed: Vec<Network> = if recursive {
            let keys: Vec<NetworkKey> = self
                .query_containing(cidr.mask, cidr.network_address(), cidr.broadcast_address())
                .iter()
                .map(|n| key_of(&n.cidr))
                .collect();
            keys.iter()
                .filter_map(|k| self.networks.remove(k))
                .collect()
        } else {
            self.networks.remove(&key_of(cidr)).into_iter().collect()
        };

        if !removed.is_empty() {
            self.tags
                .retain(|(network_id, _), _| !removed.iter().any(|n| n.id == *network_id));
            self.revision += 1;
        }
        removed
    }

    /// Every block with `prefix_len >= min_prefix_len` whose address lies in
    /// `[lo, hi]`, parents listed before their children.
    pub fn query_containing(&self, min_prefix_len: u8, lo: u64, hi: u64) -> Vec<Network> {
        if lo > hi {
            return Vec::new();
        }
        self.networks
            .range((lo, 0)..=(hi, MAX_LENGTH))
            .filter(|(_, n)| n.cidr.mask >= min_prefix_len)
            .map(|(_, n)| n.clone())
            .collect()
    }
}
