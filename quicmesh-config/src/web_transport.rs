//! `[web_transport]` table — `MquicWebTransportServer.*` in the specification.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WebTransport {
    pub port: u16,
    pub certificate_file: PathBuf,
    pub private_key_file: PathBuf,
}

impl Default for WebTransport {
    fn default() -> Self {
        Self {
            port: 4434,
            certificate_file: PathBuf::from("cert.pem"),
            private_key_file: PathBuf::from("key.pem"),
        }
    }
}
