//! Server bootstrap (§2 "Server", §5 "Shutdown").
//!
//! Owns the QUIC and WebTransport listeners and the shard array, load-
//! balances newly-accepted sessions onto shards round-robin, and
//! propagates shutdown to everything below it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::logic;
use crate::net::{tls, Transport};
use crate::shard::executor::{executors, ExecutorPool};
use crate::sock::{CloseReason, Sock, SockKind};

/// Accept loop errors that should abort startup (listener bind failure,
/// bad TLS credentials) map to the process's `-1` exit code (§6).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("quic: {0}")]
    Quic(String),

    #[error("web transport: {0}")]
    WebTransport(String),

    #[error(transparent)]
    Net(#[from] crate::net::Error),
}

pub struct Server {
    shutdown: Arc<Notify>,
}

impl Server {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run until SIGINT/SIGTERM. Spawns the QUIC and WebTransport accept
    /// loops as background tasks on the caller's (multi-threaded) runtime
    /// and returns once shutdown completes.
    pub async fn run(&self, config: Arc<Config>) -> Result<(), Error> {
        let quic_shutdown = self.shutdown.clone();
        let quic_config = config.clone();
        let quic_task = tokio::spawn(async move {
            if let Err(err) = run_quic(quic_config, quic_shutdown).await {
                error!(%err, "QUIC listener stopped");
            }
        });

        let wt_shutdown = self.shutdown.clone();
        let wt_config = config.clone();
        let wt_task = tokio::spawn(async move {
            if let Err(err) = run_web_transport(wt_config, wt_shutdown).await {
                error!(%err, "WebTransport listener stopped");
            }
        });

        wait_for_shutdown_signal().await;
        info!("shutdown requested, draining sessions");
        self.shutdown.notify_waiters();

        let drain = tokio::time::timeout(
            std::time::Duration::from_secs(config.general.shutdown_timeout_secs),
            async {
                let _ = quic_task.await;
                let _ = wt_task.await;
            },
        );
        if drain.await.is_err() {
            warn!("shutdown drain timed out, forcing exit");
        }

        Ok(())
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.ok() };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => (),
        _ = terminate => (),
    }
}

async fn run_quic(config: Arc<Config>, shutdown: Arc<Notify>) -> Result<(), Error> {
    let quic = &config.quic;
    let mut server_config =
        tls::quinn_server_config(&quic.certificate_file, &quic.private_key_file, &quic.alpn)
            .map_err(|e| Error::Quic(e.to_string()))?;

    let mut transport = quinn::TransportConfig::default();
    let idle_timeout = quinn::IdleTimeout::try_from(std::time::Duration::from_secs(
        quic.idle_timeout_secs,
    ))
    .map_err(|_| Error::Quic("idle_timeout_secs out of range".into()))?;
    transport.max_idle_timeout(Some(idle_timeout));
    transport.keep_alive_interval(Some(std::time::Duration::from_secs(quic.keep_alive_secs)));
    server_config.transport_config(Arc::new(transport));

    let addr = SocketAddr::from(([0, 0, 0, 0], quic.port));
    let endpoint =
        quinn::Endpoint::server(server_config, addr).map_err(|e| Error::Quic(e.to_string()))?;

    info!(port = quic.port, "QUIC listener started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                endpoint.close(0u32.into(), b"shutting down");
                break;
            }
            incoming = endpoint.accept() => {
                let Some(incoming) = incoming else { break };
                let max_frame_len = quic.max_frame_len;
                let registration_timeout =
                    std::time::Duration::from_secs(config.general.registration_timeout_secs);

                tokio::spawn(async move {
                    match incoming.await {
                        Ok(connection) => {
                            if let Err(err) =
                                accept_quic_connection(connection, max_frame_len, registration_timeout)
                                    .await
                            {
                                warn!(%err, "QUIC connection rejected");
                            }
                        }
                        Err(err) => warn!(%err, "QUIC handshake failed"),
                    }
                });
            }
        }
    }

    Ok(())
}

async fn accept_quic_connection(
    connection: quinn::Connection,
    max_frame_len: usize,
    registration_timeout: std::time::Duration,
) -> Result<(), Error> {
    let remote = connection.remote_address();
    let (send, recv) = connection.accept_bi().await.map_err(|e| Error::Quic(e.to_string()))?;
    let transport = Transport::Quic(crate::net::transport::QuicTransport::new(
        send,
        recv,
        remote,
        max_frame_len,
    ));

    dispatch_new_session(transport, registration_timeout);
    Ok(())
}

async fn run_web_transport(config: Arc<Config>, shutdown: Arc<Notify>) -> Result<(), Error> {
    let wt = &config.web_transport;
    let tls_config = tls::server_config(&wt.certificate_file, &wt.private_key_file, "h3")
        .map_err(|e| Error::WebTransport(e.to_string()))?;

    let endpoint_config = wtransport::ServerConfig::builder()
        .with_bind_address(SocketAddr::from(([0, 0, 0, 0], wt.port)))
        .with_custom_tls(tls_config)
        .build();
    let endpoint = wtransport::Endpoint::server(endpoint_config)
        .map_err(|e| Error::WebTransport(e.to_string()))?;

    info!(port = wt.port, "WebTransport listener started");
    let registration_timeout =
        std::time::Duration::from_secs(config.general.registration_timeout_secs);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            incoming_session = endpoint.accept() => {
                tokio::spawn(async move {
                    match accept_web_transport_session(incoming_session, registration_timeout).await
                    {
                        Ok(()) => (),
                        Err(err) => warn!(%err, "WebTransport session rejected"),
                    }
                });
            }
        }
    }

    Ok(())
}

async fn accept_web_transport_session(
    incoming_session: wtransport::endpoint::IncomingSession,
    registration_timeout: std::time::Duration,
) -> Result<(), Error> {
    let request = incoming_session
        .await
        .map_err(|e| Error::WebTransport(e.to_string()))?;
    let connection = request
        .accept()
        .await
        .map_err(|e| Error::WebTransport(e.to_string()))?;

    let transport = Transport::WebTransport(crate::net::transport::WebTransportSession::new(connection));
    dispatch_new_session(transport, registration_timeout);
    Ok(())
}

/// Load-balance a newly-accepted session onto a shard round-robin (§2,
/// §4.7) and hand it its lifetime there.
fn dispatch_new_session(transport: Transport, registration_timeout: std::time::Duration) {
    let target = executors().next().index;
    executors().shard(target).post(move |shard| {
        let sock = Sock::new(transport, registration_timeout);
        let handle = sock.handle.clone();
        let shard_index = shard.index;

        tokio::task::spawn_local(async move {
            let close_reason = sock
                .run(|sock_handle, frame| {
                    let sock_handle = sock_handle.clone();
                    executors().shard(shard_index).post(move |shard| {
                        logic::get().dispatch(shard, sock_handle, frame);
                    });
                })
                .await;

            on_session_closed(shard_index, handle, close_reason);
        });
    });
}

fn on_session_closed(
    shard_index: usize,
    handle: std::rc::Rc<crate::sock::SockHandle>,
    reason: CloseReason,
) {
    let account_id = handle.account_id();
    let kind = handle.kind();
    info!(account_id, ?reason, "session closed");

    executors().shard(shard_index).post(move |shard| {
        if !account_id.is_empty() {
            shard.detach(&account_id, &executors());
        }
    });

    if kind == SockKind::CloudProcess {
        let account_id = handle.account_id();
        logic::get().synthesize_logout(shard_index, account_id);
    }
}
