// cargo watch -x 'fmt' -x 'test'

pub mod cli;
pub mod config;
pub mod error;
pub mod fault;
pub mod ipam;
pub mod logging;
pub mod models;
pub mod output;
pub mod processing;
pub mod rpc;
pub mod store;

pub use error::{IpamError, IpamResult};
pub use fault::Fault;
pub use ipam::Ipam;
pub use store::NetworkStore;
