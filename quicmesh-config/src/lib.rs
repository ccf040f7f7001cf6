//! Configuration.

pub mod error;
pub mod general;
pub mod logging;
pub mod mysql;
pub mod quic;
pub mod web_transport;

pub use error::Error;
pub use general::General;
pub use logging::Logging;
pub use mysql::Mysql;
pub use quic::Quic;
pub use web_transport::WebTransport;

use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Top-level configuration, corresponding to `quicmesh.toml`.
///
/// Every table maps to one of the `Config keys` groups in the specification:
/// `[quic]` is `MsquicStorage.*`, `[web_transport]` is `MquicWebTransportServer.*`,
/// `[mysql]` is `Mysql.*`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub quic: Quic,
    pub web_transport: WebTransport,
    pub mysql: Mysql,
    pub general: General,
    pub logging: Logging,
}

impl Config {
    /// Load configuration from disk, falling back to defaults if the file
    /// doesn't exist.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let config: Config = if let Ok(contents) = read_to_string(path) {
            let config = toml::from_str(&contents).map_err(|err| Error::Parse {
                path: path.to_owned(),
                source: err,
            })?;
            info!("loaded \"{}\"", path.display());
            config
        } else {
            warn!(
                "\"{}\" doesn't exist, loading defaults instead",
                path.display()
            );
            Config::default()
        };

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), Error> {
        if self.quic.port == self.web_transport.port {
            return Err(Error::PortCollision(self.quic.port));
        }
        Ok(())
    }
}

/// Default path to the configuration file.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("quicmesh.toml")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_serializable() {
        let config = Config::default();
        toml::to_string(&config).unwrap();
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/tmp/quicmesh-does-not-exist.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_parses_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quicmesh.toml");
        std::fs::write(
            &path,
            r#"
            [quic]
            port = 5000

            [mysql]
            database = "game"
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.quic.port, 5000);
        assert_eq!(config.mysql.database, "game");
    }

    #[test]
    fn test_port_collision_rejected() {
        let mut config = Config::default();
        config.web_transport.port = config.quic.port;
        assert!(config.check().is_err());
    }
}
