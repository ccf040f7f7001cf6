//! Session (`Sock`): one instance per remote peer (§4.1).
//!
//! A `Sock` is created when a transport accepts a new connection and is
//! owned, for its entire lifetime, by the shard that accepted it. It is
//! never sent to another thread; other shards reach it only through
//! [`crate::router`]'s `post`-based forwarding.

use std::cell::{Cell, RefCell};
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::net::{Transport, TransportKind};

/// What kind of peer registered this session as, per §3/§4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockKind {
    /// Not yet registered.
    Unregistered,
    /// A generic end-user client (requestType 0 REGISTER).
    Generic,
    /// A cloud game-server host (SERVER_REGISTER/SERVER_LOGIN).
    CloudServer,
    /// A cloud game process (PROCESS_LOGIN).
    CloudProcess,
}

/// The shared, cheaply-clonable face of a session that handlers running
/// elsewhere on the same shard hold onto: the write queue and the bits of
/// identity a handler needs to read or flip.
pub struct SockHandle {
    pub remote_addr: SocketAddr,
    pub transport_kind: TransportKind,
    account_id: RefCell<String>,
    is_registered: Cell<bool>,
    kind: Cell<SockKind>,
    game_type: RefCell<Option<String>>,
    write_tx: mpsc::UnboundedSender<Value>,
}

impl SockHandle {
    /// A placeholder handle with no live transport behind it, for code that
    /// needs to hand a `SockHandle` to a function but has no session left
    /// to address (the synthetic PROCESS_LOGOUT on teardown, §4.1).
    pub fn detached() -> Self {
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        Self {
            remote_addr: "0.0.0.0:0".parse().unwrap(),
            transport_kind: TransportKind::Quic,
            account_id: RefCell::new(String::new()),
            is_registered: Cell::new(false),
            kind: Cell::new(SockKind::Unregistered),
            game_type: RefCell::new(None),
            write_tx,
        }
    }

    pub fn account_id(&self) -> String {
        self.account_id.borrow().clone()
    }

    pub fn set_account_id(&self, id: impl Into<String>) {
        *self.account_id.borrow_mut() = id.into();
    }

    pub fn is_registered(&self) -> bool {
        self.is_registered.get()
    }

    /// One-shot: once set, registration status never reverts except via
    /// session teardown (§4.1).
    pub fn set_registered(&self) {
        self.is_registered.set(true);
    }

    pub fn kind(&self) -> SockKind {
        self.kind.get()
    }

    pub fn set_kind(&self, kind: SockKind) {
        self.kind.set(kind);
    }

    pub fn game_type(&self) -> Option<String> {
        self.game_type.borrow().clone()
    }

    pub fn set_game_type(&self, game_type: impl Into<String>) {
        *self.game_type.borrow_mut() = Some(game_type.into());
    }

    /// Enqueue a frame for sending. Never blocks; the session's task drains
    /// the queue in send order.
    pub fn write(&self, frame: Value) {
        if self.write_tx.send(frame).is_err() {
            debug!(account_id = %self.account_id(), "write to closed session dropped");
        }
    }
}

/// Why a session's task loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    TransportClosed,
    RegistrationTimeout,
    FramingError,
}

/// The session itself: owns the transport and the write-queue receiver.
/// Consumed by [`Sock::run`], which is the session's entire lifetime.
pub struct Sock {
    pub handle: Rc<SockHandle>,
    transport: Transport,
    write_rx: mpsc::UnboundedReceiver<Value>,
    registration_deadline: Instant,
}

impl Sock {
    pub fn new(transport: Transport, registration_timeout: Duration) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let handle = Rc::new(SockHandle {
            remote_addr: transport.remote_addr(),
            transport_kind: transport.kind(),
            account_id: RefCell::new(String::new()),
            is_registered: Cell::new(false),
            kind: Cell::new(SockKind::Unregistered),
            game_type: RefCell::new(None),
            write_tx,
        });

        Self {
            handle,
            transport,
            write_rx,
            registration_deadline: Instant::now() + registration_timeout,
        }
    }

    /// Drive the session until the transport closes, the registration
    /// deadline fires, or a framing error occurs. Returns why it stopped;
    /// the caller (the shard's accept loop) is responsible for detaching
    /// the session and, for cloud processes, synthesising the logout frame
    /// (§4.1 "Cloud-process logout hook").
    pub async fn run<F>(mut self, mut on_frame: F) -> CloseReason
    where
        F: FnMut(&Rc<SockHandle>, Value),
    {
        loop {
            if !self.handle.is_registered() && Instant::now() >= self.registration_deadline {
                return CloseReason::RegistrationTimeout;
            }

            tokio::select! {
                biased;

                _ = tokio::time::sleep_until(self.registration_deadline), if !self.handle.is_registered() => {
                    return CloseReason::RegistrationTimeout;
                }

                frame = self.write_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Err(err) = self.transport.send(&frame).await {
                                warn!(account_id = %self.handle.account_id(), %err, "send failed");
                                return CloseReason::TransportClosed;
                            }
                        }
                        None => return CloseReason::TransportClosed,
                    }
                }

                frame = self.transport.recv() => {
                    match frame {
                        Ok(Some(frame)) => on_frame(&self.handle, frame),
                        Ok(None) => return CloseReason::TransportClosed,
                        Err(err) => {
                            warn!(remote = %self.handle.remote_addr, %err, "framing error, closing session");
                            return CloseReason::FramingError;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_handle_registration_is_one_shot() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = SockHandle {
            remote_addr: "127.0.0.1:1".parse().unwrap(),
            transport_kind: TransportKind::Quic,
            account_id: RefCell::new(String::new()),
            is_registered: Cell::new(false),
            kind: Cell::new(SockKind::Unregistered),
            game_type: RefCell::new(None),
            write_tx: tx,
        };

        assert!(!handle.is_registered());
        handle.set_registered();
        assert!(handle.is_registered());
    }

    #[test]
    fn test_handle_account_id_round_trip() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = SockHandle {
            remote_addr: "127.0.0.1:1".parse().unwrap(),
            transport_kind: TransportKind::Quic,
            account_id: RefCell::new(String::new()),
            is_registered: Cell::new(false),
            kind: Cell::new(SockKind::Unregistered),
            game_type: RefCell::new(None),
            write_tx: tx,
        };

        handle.set_account_id("alice");
        assert_eq!(handle.account_id(), "alice");
    }
}
