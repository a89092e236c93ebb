//! On-disk snapshot of the store.
//!
//! The file mirrors the two relations of the database: networks and tags.
//! It is rewritten after every committed write transaction.

use super::state::{key_of, StoreState};
use crate::error::{IpamError, IpamResult};
use crate::models::{Ipv4, Network};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    pub next_id: u64,
    pub networks: Vec<NetworkRow>,
    #[serde(default)]
    pub tags: Vec<TagRow>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkRow {
    pub id: u64,
    /// Human readable form; `address` and `prefix_len` are what queries use.
    pub net: String,
    pub address: u64,
    pub prefix_len: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TagRow {
    pub network_id: u64,
    pub name: String,
    pub value: String,
}

impl From<&StoreState> for Snapshot {
    fn from(state: &StoreState) -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Some(Utc::now()),
            next_id: state.next_id,
            networks: state
                .networks
                .values()
                .map(|n| NetworkRow {
                    id: n.id,
                    net: n.cidr.to_string(),
                    address: n.address(),
                    prefix_len: n.prefix_len(),
                })
                .collect(),
            tags: state
                .tags
                .iter()
                .map(|((network_id, name), value)| TagRow {
                    network_id: *network_id,
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<Snapshot> for StoreState {
    type Error = IpamError;

    fn try_from(snapshot: Snapshot) -> Result<Self, Self::Error> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(IpamError::CorruptSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }

        let mut state = StoreState {
            next_id: snapshot.next_id,
            ..Default::default()
        };
        let mut ids = HashSet::new();

        for row in snapshot.networks {
            let cidr = Ipv4::parse_network(&row.net)
                .map_err(|e| IpamError::CorruptSnapshot(format!("network {}: {e}", row.id)))?;
            if cidr.network_address() != row.address || cidr.mask != row.prefix_len {
                return Err(IpamError::CorruptSnapshot(format!(
                    "network {} '{}' does not match address={} prefix_len={}",
                    row.id, row.net, row.address, row.prefix_len
                )));
            }
            if row.id > state.next_id || !ids.insert(row.id) {
                return Err(IpamError::CorruptSnapshot(format!(
                    "network id {} is duplicated or beyond next_id",
                    row.id
                )));
            }
            let network = Network { id: row.id, cidr };
            if state.networks.insert(key_of(&cidr), network).is_some() {
                return Err(IpamError::CorruptSnapshot(format!(
                    "network {} is stored twice",
                    row.net
                )));
            }
        }

        let mut tags = BTreeMap::new();
        for row in snapshot.tags {
            if !ids.contains(&row.network_id) {
                return Err(IpamError::CorruptSnapshot(format!(
                    "tag '{}' references unknown network {}",
                    row.name, row.network_id
                )));
            }
            tags.insert((row.network_id, row.name), row.value);
        }
        state.tags = tags;

        Ok(state)
    }
}

/// Read a snapshot file. `Ok(None)` if the file does not exist yet.
pub fn read_snapshot(path: &Path) -> IpamResult<Option<StoreState>> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Database file not found: {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    log::info!("Reading database file: {}", path.display());

    let mut deserializer = serde_json::Deserializer::from_str(&json);
    let snapshot: Snapshot = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        IpamError::CorruptSnapshot(format!("path={} error={}", e.path(), e.inner()))
    })?;
    StoreState::try_from(snapshot).map(Some)
}

/// Write the snapshot next to `path` and move it into place.
pub fn write_snapshot(path: &Path, state: &StoreState) -> IpamResult<()> {
    let json = serde_json::to_string_pretty(&Snapshot::from(state))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    log::debug!(
        "Wrote {} networks to {}",
        state.networks.len(),
        path.display()
    );
    Ok(())
}
