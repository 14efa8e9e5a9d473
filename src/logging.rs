//! Tracing setup.
//!
//! stdout carries the protocol, so logs go to stderr or to a file. Nothing in this
//! crate may print to stdout.

use std::fs::OpenOptions;
use std::io::{self, ErrorKind};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: &LogConfig) -> io::Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    installed.map_err(io::Error::other)
}
