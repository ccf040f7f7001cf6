//! Transport-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls: {0}")]
    Tls(#[from] rustls::Error),

    #[error("malformed pem at \"{0}\"")]
    Pem(std::path::PathBuf),

    #[error("negative frame length: {0}")]
    NegativeLength(i64),

    #[error("frame of {0} bytes exceeds the {1} byte limit")]
    FrameTooLarge(i64, usize),

    #[error("frame body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame body is not a JSON object")]
    NotAnObject,

    #[error("quic: {0}")]
    Quic(String),

    #[error("web transport: {0}")]
    WebTransport(String),

    #[error("session closed")]
    Closed,
}
