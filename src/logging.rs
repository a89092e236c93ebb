//! log4rs setup.

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::Path;

/// Initialise logging from `path`, or log to stderr if it is missing.
///
/// `level` comes from `-v`; when given it replaces the root level of the
/// file config. Without a file the default level is `Warn`. Output goes to
/// stderr so command results on stdout stay parseable.
pub fn init_logging(path: &Path, level: Option<LevelFilter>) -> Result<(), Box<dyn Error>> {
    let config = load_config(path, level)?;
    log4rs::init_config(config)?;
    log::debug!("Logging configured, config file {}", path.display());
    Ok(())
}

/// Build the log4rs config without installing it.
pub fn load_config(path: &Path, level: Option<LevelFilter>) -> Result<Config, Box<dyn Error>> {
    if path.exists() {
        let mut config = log4rs::config::load_config_file(path, Default::default())?;
        if let Some(level) = level {
            config.root_mut().set_level(level);
        }
        return Ok(config);
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l:5})} {t} - {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(
            Root::builder()
                .appender("stderr")
                .build(level.unwrap_or(LevelFilter::Warn)),
        )?;
    Ok(config)
}
