//! Process configuration.
//!
//! Defaults below, overridden by environment variables (a `.env` file is
//! read first), overridden in turn by command-line flags.

use std::path::PathBuf;

pub const DEFAULT_DATABASE_FILE: &str = "minipam.json";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_LOG_CONFIG: &str = "log4rs.yml";
/// Longest accepted request line, in bytes.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

pub const ENV_DATABASE_FILE: &str = "MINIPAM_DATABASE_FILE";
pub const ENV_LISTEN_ADDR: &str = "MINIPAM_LISTEN_ADDR";
pub const ENV_LOG_CONFIG: &str = "MINIPAM_LOG_CONFIG";
pub const ENV_MAX_REQUEST_BYTES: &str = "MINIPAM_MAX_REQUEST_BYTES";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_file: PathBuf,
    pub listen_addr: String,
    pub log_config: PathBuf,
    pub max_request_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            log_config: PathBuf::from(DEFAULT_LOG_CONFIG),
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }
}

impl Config {
    /// Defaults plus process environment (after loading `.env`).
    ///
    /// Also returns a message per ignored setting. Logging is not up yet
    /// when this runs, so the caller logs them.
    pub fn from_env() -> (Config, Vec<String>) {
        dotenv::dotenv().ok();
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults plus whatever `lookup` returns for the `MINIPAM_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Config, Vec<String>) {
        let mut config = Config::default();
        let mut ignored = Vec::new();
        if let Some(file) = lookup(ENV_DATABASE_FILE) {
            config.database_file = PathBuf::from(file);
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            config.listen_addr = addr;
        }
        if let Some(file) = lookup(ENV_LOG_CONFIG) {
            config.log_config = PathBuf::from(file);
        }
        if let Some(bytes) = lookup(ENV_MAX_REQUEST_BYTES) {
            match bytes.parse::<usize>() {
                Ok(n) if n > 0 => config.max_request_bytes = n,
                _ => ignored.push(format!(
                    "Ignoring {ENV_MAX_REQUEST_BYTES}={bytes}, using {}",
                    config.max_request_bytes
                )),
            }
        }
        (config, ignored)
    }
}
