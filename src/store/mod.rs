//! Persistent set of claimed networks and their tags.
//!
//! This module handles storage:
//! - [`state`] - the in-memory relations and their queries
//! - [`tags`] - tag rows keyed by network
//! - [`snapshot`] - the JSON database file
//!
//! [`NetworkStore`] is an explicit handle with an open/close lifecycle. All
//! access goes through one lock; [`NetworkStore::write`] is a transaction
//! that either commits (and persists) every change made by its closure or
//! none of them.

mod snapshot;
mod state;
mod tags;

pub use snapshot::{read_snapshot, write_snapshot, NetworkRow, Snapshot, TagRow};
pub use state::StoreState;

use crate::error::{IpamError, IpamResult};
use crate::models::{Ipv4, Network};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct Inner {
    state: StoreState,
    closed: bool,
}

#[derive(Debug)]
pub struct NetworkStore {
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

impl NetworkStore {
    /// Open the database file at `path`, creating an empty one if absent.
    pub fn open(path: impl AsRef<Path>) -> IpamResult<NetworkStore> {
        let path = path.as_ref().to_path_buf();
        let state = match read_snapshot(&path)? {
            Some(state) => state,
            None => {
                log::warn!("Creating empty database file: {}", path.display());
                let state = StoreState::default();
                write_snapshot(&path, &state)?;
                state
            }
        };
        log::info!(
            "Opened network store {} with {} networks",
            path.display(),
            state.len()
        );
        Ok(NetworkStore {
            path: Some(path),
            inner: Mutex::new(Inner {
                state,
                closed: false,
            }),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> NetworkStore {
        NetworkStore {
            path: None,
            inner: Mutex::new(Inner {
                state: StoreState::default(),
                closed: false,
            }),
        }
    }

    /// Run `f` against a consistent view of the store.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> IpamResult<T> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(IpamError::StoreClosed);
        }
        Ok(f(&inner.state))
    }

    /// Run `f` as one transaction.
    ///
    /// If `f` fails, or the snapshot cannot be written, the state is rolled
    /// back to what it was before the call.
    pub fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> IpamResult<T>) -> IpamResult<T> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(IpamError::StoreClosed);
        }
        // full copy of networks and tags, O(n) per transaction
        let backup = inner.state.clone();

        let result = f(&mut inner.state).and_then(|value| {
            if inner.state.revision != backup.revision {
                if let Some(path) = &self.path {
                    write_snapshot(path, &inner.state)?;
                }
            }
            Ok(value)
        });
        if result.is_err() {
            inner.state = backup;
        }
        result
    }

    /// Flush and close the handle; later calls fail with [`IpamError::StoreClosed`].
    pub fn close(&self) -> IpamResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        if let Some(path) = &self.path {
            write_snapshot(path, &inner.state)?;
            log::info!("Closed network store {}", path.display());
        }
        inner.closed = true;
        Ok(())
    }

    pub fn register(&self, cidr: Ipv4) -> IpamResult<Network> {
        self.write(|state| {
            let (network, inserted) = state.register(cidr);
            if inserted {
                log::debug!("Registered {cidr} as id {}", network.id);
            }
            Ok(network)
        })
    }

    pub fn remove(&self, cidr: Ipv4, recursive: bool) -> IpamResult<Vec<Network>> {
        self.write(|state| Ok(state.remove(&cidr, recursive)))
    }
}
