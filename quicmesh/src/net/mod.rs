//! Network layer: QUIC/WebTransport transport abstraction and the
//! length-prefixed frame codec (§4.1, §6).

pub mod error;
pub mod frame;
pub mod tls;
pub mod transport;

pub use error::Error;
pub use transport::{Transport, TransportKind};
