//! TLS credential loading.
//!
//! The QUIC and WebTransport listeners each build their own transport-level
//! configuration (`quinn`/`wtransport` wrap `rustls` differently) but both
//! start from the same certificate and private key files, so the loading
//! and error-mapping lives here once.

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use super::Error;

/// Load a certificate chain and private key from PEM files and build a
/// `rustls::ServerConfig` with no client authentication, as msquic-style
/// deployments use self-signed or internally-issued certs.
pub fn server_config(cert: &Path, key: &Path, alpn: &str) -> Result<rustls::ServerConfig, Error> {
    let cert = CertificateDer::from_pem_file(cert).map_err(|_| Error::Pem(cert.to_owned()))?;
    let key = PrivateKeyDer::from_pem_file(key).map_err(|_| Error::Pem(key.to_owned()))?;

    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)?;

    config.alpn_protocols = vec![alpn.as_bytes().to_vec()];
    Ok(config)
}

/// Same as [`server_config`] but already wrapped for `quinn`.
pub fn quinn_server_config(
    cert: &Path,
    key: &Path,
    alpn: &str,
) -> Result<quinn::ServerConfig, Error> {
    let tls = server_config(cert, key, alpn)?;
    let quic_tls = quinn::crypto::rustls::QuicServerConfig::try_from(tls)
        .map_err(|e| Error::Quic(e.to_string()))?;
    Ok(quinn::ServerConfig::with_crypto(Arc::new(quic_tls)))
}
