//! Client side of the line-delimited JSON protocol.

use super::protocol::{Request, Response};
use crate::fault::Fault;
use crate::models::ContainmentNode;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Message serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server fault: {0}")]
    Fault(Fault),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub struct RpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl RpcClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<RpcClient, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(RpcClient {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
        })
    }

    /// Send one request and wait for its response.
    pub async fn call(&mut self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request {
            id,
            method: method.to_string(),
            params,
        };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply).await? == 0 {
            return Err(ClientError::Protocol(
                "server closed the connection".to_string(),
            ));
        }
        let response: Response = serde_json::from_str(&reply)?;
        if response.id != id && response.fault.is_none() {
            return Err(ClientError::Protocol(format!(
                "response id {} does not match request id {id}",
                response.id
            )));
        }
        response.into_result().map_err(ClientError::Fault)
    }

    pub async fn get_net(&mut self, net: &str, depth: i64) -> Result<ContainmentNode, ClientError> {
        let tree = self
            .call("get_net", json!({ "net": net, "depth": depth }))
            .await?;
        Ok(serde_json::from_value(tree)?)
    }

    pub async fn claim_net(
        &mut self,
        net: &str,
        prefix_len: u8,
    ) -> Result<ContainmentNode, ClientError> {
        let node = self
            .call("claim_net", json!({ "net": net, "prefix_len": prefix_len }))
            .await?;
        Ok(serde_json::from_value(node)?)
    }
}
