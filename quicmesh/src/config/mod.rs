//! Process-wide configuration accessor.
//!
//! Wraps [`quicmesh_config::Config`] behind an [`ArcSwap`] so every shard
//! and subsystem reads the same up-to-date snapshot without taking a lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

pub use quicmesh_config::{Config, Error, General, Logging, Mysql, Quic, WebTransport};

static CONFIG: Lazy<ArcSwap<Config>> = Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Current configuration snapshot.
pub fn config() -> Arc<Config> {
    CONFIG.load_full()
}

/// Load configuration from `path` and install it as the process-wide
/// snapshot.
pub fn load(path: &Path) -> Result<Arc<Config>, Error> {
    let config = Config::load(path)?;
    Ok(set(config))
}

/// Install an already-constructed configuration as the process-wide
/// snapshot. Mostly useful in tests.
pub fn set(config: Config) -> Arc<Config> {
    let config = Arc::new(config);
    CONFIG.store(config.clone());
    config
}

/// Default path to the configuration file, `quicmesh.toml` in the working
/// directory.
pub fn default_config_path() -> PathBuf {
    quicmesh_config::default_config_path()
}
