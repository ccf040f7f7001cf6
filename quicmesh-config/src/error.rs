//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("error parsing \"{}\": {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("quic.port and web_transport.port must differ, both are {0}")]
    PortCollision(u16),
}
