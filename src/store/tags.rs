//! Free-form tags attached to registered networks.
//!
//! Keyed by `(network id, tag name)`; rows disappear with their network.

use super::StoreState;
use crate::error::{IpamError, IpamResult};
use crate::models::Ipv4;
use std::collections::BTreeMap;

impl StoreState {
    pub fn add_tag(&mut self, cidr: &Ipv4, name: &str, value: &str) -> IpamResult<()> {
        let network_id = self
            .get(cidr)
            .map(|n| n.id)
            .ok_or_else(|| IpamError::NetworkNotInDatabase(cidr.to_string()))?;
        let key = (network_id, name.to_string());
        if self.tags.contains_key(&key) {
            return Err(IpamError::TagExists {
                network: cidr.to_string(),
                name: name.to_string(),
            });
        }
        self.tags.insert(key, value.to_string());
        self.revision += 1;
        Ok(())
    }

    /// Returns the removed value, `None` if there was nothing to delete.
    pub fn delete_tag(&mut self, cidr: &Ipv4, name: &str) -> Option<String> {
        let network_id = self.get(cidr)?.id;
        let removed = self.tags.remove(&(network_id, name.to_string()));
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    pub fn modify_tag(&mut self, cidr: &Ipv4, name: &str, value: &str) -> IpamResult<()> {
        let slot = self
            .get(cidr)
            .map(|n| (n.id, name.to_string()))
            .and_then(|key| self.tags.get_mut(&key))
            .ok_or_else(|| tag_does_not_exist(cidr, name))?;
        *slot = value.to_string();
        self.revision += 1;
        Ok(())
    }

    pub fn get_tag(&self, cidr: &Ipv4, name: &str) -> IpamResult<String> {
        self.get(cidr)
            .and_then(|n| self.tags.get(&(n.id, name.to_string())))
            .cloned()
            .ok_or_else(|| tag_does_not_exist(cidr, name))
    }

    /// All tags of `cidr`; empty when the network has none or is not stored.
    pub fn get_tags(&self, cidr: &Ipv4) -> BTreeMap<String, String> {
        let Some(network) = self.get(cidr) else {
            return BTreeMap::new();
        };
        self.tags
            .range((network.id, String::new())..)
            .take_while(|((network_id, _), _)| *network_id == network.id)
            .map(|((_, name), value)| (name.clone(), value.clone()))
            .collect()
    }
}

fn tag_does_not_exist(cidr: &Ipv4, name: &str) -> IpamError {
    IpamError::TagDoesNotExist {
        network: cidr.to_string(),
        name: name.to_string(),
    }
}
