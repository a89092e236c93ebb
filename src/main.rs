use clap::Parser;
use log::LevelFilter;
use minipam::cli::{run, Cli};
use minipam::config::Config;
use minipam::logging::init_logging;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    let cli = Cli::parse();
    let (config, ignored) = Config::from_env();

    let level = match cli.verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        _ => Some(LevelFilter::Debug),
    };
    init_logging(&config.log_config, level)?;
    for message in ignored {
        log::warn!("{message}");
    }
    log::info!("#Start main()");

    run(cli, config).await
}
