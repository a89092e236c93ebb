//! Command-line interface.
//!
//! Every subcommand except `serve` maps onto one RPC method. Without
//! `--server` the call is dispatched against the local database file.

use crate::config::Config;
use crate::ipam::Ipam;
use crate::models::ContainmentNode;
use crate::output::{render_json, render_tree};
use crate::rpc::{dispatch, serve, Request, RpcClient};
use crate::store::NetworkStore;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// minipam - a small IP address-space manager
#[derive(Parser, Debug)]
#[command(name = "minipam")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Send the command to a running server (host:port)
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Database file for local commands and `serve`
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Increase verbosity (-v, -vv); replaces the root level of the log config
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the RPC server
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Show a network and the networks inside it
    GetNet {
        net: String,
        /// Levels of children to show; -1 for all
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        depth: i64,
    },
    /// Register a network
    AddNet { net: String },
    /// Remove a network
    DeleteNet {
        net: String,
        /// Also remove every network inside it
        #[arg(short, long)]
        recursive: bool,
    },
    /// Claim a free block of PREFIXLEN inside NET
    ClaimNet {
        net: String,
        #[arg(value_name = "PREFIXLEN")]
        prefix_len: u8,
    },
    AddTag {
        net: String,
        name: String,
        value: String,
    },
    DeleteTag { net: String, name: String },
    ModifyTag {
        net: String,
        name: String,
        value: String,
    },
    GetTag { net: String, name: String },
    GetTags { net: String },
}

impl Commands {
    /// RPC method and params for this command; `None` for `serve`.
    pub fn to_call(&self) -> Option<(&'static str, Value)> {
        let call = match self {
            Commands::Serve { .. } => return None,
            Commands::GetNet { net, depth } => ("get_net", json!({ "net": net, "depth": depth })),
            Commands::AddNet { net } => ("add_net", json!({ "net": net })),
            Commands::DeleteNet { net, recursive } => {
                ("delete_net", json!({ "net": net, "recursive": recursive }))
            }
            Commands::ClaimNet { net, prefix_len } => (
                "claim_net",
                json!({ "net": net, "prefix_len": prefix_len }),
            ),
            Commands::AddTag { net, name, value } => (
                "add_tag",
                json!({ "net": net, "name": name, "value": value }),
            ),
            Commands::DeleteTag { net, name } => ("delete_tag", json!({ "net": net, "name": name })),
            Commands::ModifyTag { net, name, value } => (
                "modify_tag",
                json!({ "net": net, "name": name, "value": value }),
            ),
            Commands::GetTag { net, name } => ("get_tag", json!({ "net": net, "name": name })),
            Commands::GetTags { net } => ("get_tags", json!({ "net": net })),
        };
        Some(call)
    }
}

/// Execute the parsed command line against `config`.
pub async fn run(cli: Cli, mut config: Config) -> Result<(), Box<dyn Error>> {
    if let Some(database) = cli.database {
        config.database_file = database;
    }

    let Some((method, params)) = cli.command.to_call() else {
        if let Commands::Serve { listen: Some(listen) } = &cli.command {
            config.listen_addr = listen.clone();
        }
        return run_server(&config).await;
    };

    let result = match &cli.server {
        Some(server) => {
            let mut client = RpcClient::connect(server.as_str()).await?;
            client.call(method, params).await?
        }
        None => {
            let store = Arc::new(NetworkStore::open(&config.database_file)?);
            let ipam = Ipam::new(store.clone());
            let request = Request {
                id: 0,
                method: method.to_string(),
                params,
            };
            let response = tokio::task::spawn_blocking(move || dispatch(&ipam, request)).await?;
            store.close()?;
            response.into_result()?
        }
    };

    if matches!(method, "get_net" | "claim_net") {
        let tree: ContainmentNode = serde_json::from_value(result)?;
        print!("{}", render_tree(&tree));
    } else {
        let text = render_json(&result);
        if !text.is_empty() {
            println!("{text}");
        }
    }
    Ok(())
}

async fn run_server(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(NetworkStore::open(&config.database_file)?);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    serve(
        listener,
        Ipam::new(store.clone()),
        config.max_request_bytes,
        shutdown,
    )
    .await?;

    store.close()?;
    log::info!("exiting");
    Ok(())
}
