//! TCP server speaking line-delimited JSON.
//!
//! Each connection is served by its own task. Requests are handed to the
//! blocking pool because the store is synchronous.

use super::handlers::dispatch;
use super::protocol::{Request, Response};
use crate::fault::{Fault, STORAGE_ERROR};
use crate::ipam::Ipam;
use colored::Colorize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Accept connections until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    ipam: Ipam,
    max_request_bytes: usize,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    log::info!(
        "Listening on {}",
        listener.local_addr()?.to_string().on_blue()
    );
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::warn!("accept failed: {e}");
                        continue;
                    }
                };
                let ipam = ipam.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer, ipam, max_request_bytes).await {
                        log::warn!("connection {peer} ended with error: {e}");
                    }
                });
            }
            _ = &mut shutdown => {
                log::info!("Shutdown requested, no longer accepting connections");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ipam: Ipam,
    max_request_bytes: usize,
) -> std::io::Result<()> {
    log::debug!("connection from {peer}");
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let mut bytes = Vec::new();
        let read = (&mut reader)
            .take(max_request_bytes as u64 + 1)
            .read_until(b'\n', &mut bytes)
            .await?;
        if read == 0 {
            log::debug!("connection from {peer} closed");
            return Ok(());
        }
        if bytes.len() > max_request_bytes && bytes.last() != Some(&b'\n') {
            let fault = Fault::invalid_request(format!(
                "request exceeds {max_request_bytes} bytes"
            ));
            log::warn!("oversized request from {peer}");
            discard_line(&mut reader).await?;
            write_response(&mut writer, &Response::fault(0, fault)).await?;
            continue;
        }
        let line = match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("non UTF-8 request from {peer}");
                let fault = Fault::invalid_request(format!("request is not UTF-8: {e}"));
                write_response(&mut writer, &Response::fault(0, fault)).await?;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let id = request.id;
                let ipam = ipam.clone();
                match tokio::task::spawn_blocking(move || dispatch(&ipam, request)).await {
                    Ok(response) => response,
                    Err(e) => {
                        log::error!("request #{id} from {peer} panicked: {e}");
                        Response::fault(id, Fault::from_code(STORAGE_ERROR, "internal error"))
                    }
                }
            }
            Err(e) => Response::fault(0, Fault::invalid_request(format!("malformed request: {e}"))),
        };
        write_response(&mut writer, &response).await?;
    }
}

/// Skip input up to and including the next newline.
async fn discard_line(reader: &mut (impl AsyncBufRead + Unpin)) -> std::io::Result<()> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }
        match buf.iter().position(|b| *b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(());
            }
            None => {
                let n = buf.len();
                reader.consume(n);
            }
        }
    }
}

async fn write_response(
    writer: &mut (impl AsyncWrite + Unpin),
    response: &Response,
) -> std::io::Result<()> {
    let mut json = serde_json::to_string(response)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await
}
