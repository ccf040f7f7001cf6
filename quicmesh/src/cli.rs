//! Command line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use std::fs::read_to_string;
use thiserror::Error;

use crate::config::Config;

/// Sharded QUIC/WebTransport message router and session broker.
#[derive(Parser, Debug)]
#[command(name = "quicmesh", version)]
pub struct Cli {
    /// Path to the configuration file. Default: "quicmesh.toml"
    #[arg(short, long, default_value = "quicmesh.toml")]
    pub config: PathBuf,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the router.
    Run,

    /// Check the configuration file for errors without starting anything.
    Configcheck,
}

#[derive(Debug, Error)]
pub enum ConfigCheckError {
    #[error("I/O error on `{0}`: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("TOML parse error in `{0}`: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// Confirm that the configuration file is valid.
pub fn config_check(config_path: &PathBuf) -> Result<(), ConfigCheckError> {
    let contents =
        read_to_string(config_path).map_err(|e| ConfigCheckError::Io(config_path.clone(), e))?;
    toml::from_str::<Config>(&contents)
        .map_err(|e| ConfigCheckError::Parse(config_path.clone(), e))?;
    Ok(())
}
