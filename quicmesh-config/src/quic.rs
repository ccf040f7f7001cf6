//! `[quic]` table — `MsquicStorage.*` in the specification.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Quic {
    pub port: u16,
    pub certificate_file: PathBuf,
    pub private_key_file: PathBuf,
    /// ALPN protocol identifier negotiated on connect.
    pub alpn: String,
    /// QUIC idle timeout, per §5.
    pub idle_timeout_secs: u64,
    /// QUIC keep-alive interval, per §5.
    pub keep_alive_secs: u64,
    /// Maximum accepted frame body length, per §6 ("deployment-chosen cap").
    pub max_frame_len: usize,
}

impl Default for Quic {
    fn default() -> Self {
        Self {
            port: 4433,
            certificate_file: PathBuf::from("cert.pem"),
            private_key_file: PathBuf::from("key.pem"),
            alpn: "quic".into(),
            idle_timeout_secs: 10,
            keep_alive_secs: 5,
            max_frame_len: 16 * 1024 * 1024,
        }
    }
}
