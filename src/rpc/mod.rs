//! Remote access to the address-space manager.
//!
//! This module handles the RPC interface:
//! - [`protocol`] - Request/response framing and parameter types
//! - [`handlers`] - Dispatch of requests onto [`crate::Ipam`]
//! - [`server`] - Tokio TCP server
//! - [`client`] - Tokio TCP client

mod client;
mod handlers;
pub mod protocol;
mod server;

pub use client::{ClientError, RpcClient};
pub use handlers::dispatch;
pub use protocol::{Request, Response, METHODS};
pub use server::serve;
