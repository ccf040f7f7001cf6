//! Unified transport handle over QUIC (`quinn`) and WebTransport
//! (`wtransport`), so the rest of the router only ever deals with "give me
//! the next frame" / "send this frame" (§4.1).

use std::net::SocketAddr;

use serde_json::Value;

use super::frame::{self, Decoder};
use super::Error;

const READ_CHUNK: usize = 16 * 1024;

/// Which wire format a session's transport uses. WebTransport datagrams
/// already preserve message boundaries; QUIC streams do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Quic,
    WebTransport,
}

pub struct QuicTransport {
    send: quinn::SendStream,
    recv: quinn::RecvStream,
    decoder: Decoder,
    remote: SocketAddr,
}

impl QuicTransport {
    pub fn new(
        send: quinn::SendStream,
        recv: quinn::RecvStream,
        remote: SocketAddr,
        max_frame_len: usize,
    ) -> Self {
        Self {
            send,
            recv,
            decoder: Decoder::new(max_frame_len),
            remote,
        }
    }
}

pub struct WebTransportSession {
    connection: wtransport::Connection,
    remote: SocketAddr,
}

impl WebTransportSession {
    pub fn new(connection: wtransport::Connection) -> Self {
        let remote = connection.remote_address();
        Self { connection, remote }
    }
}

/// A session's I/O handle. One per [`crate::sock::Sock`]; never shared
/// across shards.
pub enum Transport {
    Quic(QuicTransport),
    WebTransport(WebTransportSession),
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Quic(_) => TransportKind::Quic,
            Transport::WebTransport(_) => TransportKind::WebTransport,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        match self {
            Transport::Quic(t) => t.remote,
            Transport::WebTransport(t) => t.remote,
        }
    }

    /// Wait for the next complete frame, reassembling QUIC stream bytes as
    /// needed. Returns `Ok(None)` when the peer closed cleanly.
    pub async fn recv(&mut self) -> Result<Option<Value>, Error> {
        match self {
            Transport::Quic(t) => {
                if let Some(frame) = t.decoder.next_frame()? {
                    return Ok(Some(frame));
                }

                let mut buf = vec![0u8; READ_CHUNK];
                loop {
                    let n = match t.recv.read(&mut buf).await.map_err(|e| Error::Quic(e.to_string()))? {
                        Some(n) => n,
                        None => return Ok(None),
                    };
                    t.decoder.push(&buf[..n]);
                    if let Some(frame) = t.decoder.next_frame()? {
                        return Ok(Some(frame));
                    }
                }
            }
            Transport::WebTransport(t) => match t.connection.receive_datagram().await {
                Ok(datagram) => Ok(Some(frame::decode_datagram(&datagram)?)),
                Err(_) => Ok(None),
            },
        }
    }

    /// Enqueue one frame for sending. Preserves message boundaries:
    /// encoded once, handed to the transport as a single unit.
    pub async fn send(&mut self, value: &Value) -> Result<(), Error> {
        match self {
            Transport::Quic(t) => {
                let bytes = frame::encode(value)?;
                t.send
                    .write_all(&bytes)
                    .await
                    .map_err(|e| Error::Quic(e.to_string()))
            }
            Transport::WebTransport(t) => {
                let body = serde_json::to_vec(value)?;
                t.connection
                    .send_datagram(body)
                    .map_err(|e| Error::WebTransport(e.to_string()))
            }
        }
    }

    pub async fn close(&mut self) {
        match self {
            Transport::Quic(t) => {
                let _ = t.send.finish();
            }
            Transport::WebTransport(t) => {
                t.connection.close(0u32.into(), b"bye");
            }
        }
    }
}
