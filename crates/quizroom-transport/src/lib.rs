//! Transport abstraction over Axum WebSocket upgrades for the quiz room
//! server.
//!
//! Earlier generations of this abstraction modeled a bare TCP-accept
//! loop (`Transport::accept`). The quiz room server needs a real HTTP
//! surface — CORS, JSON GET/POST mirror routes, the recap/analytics
//! read endpoints — sharing one listener with the realtime event
//! stream, so the accept loop is owned by `axum::serve` instead. This
//! crate now only defines the [`Connection`] trait a room/session
//! handler reads and writes through, plus the one implementation that
//! wraps an already-upgraded [`axum::extract::ws::WebSocket`].
//!
//! # Feature Flags
//!
//! - `websocket` (default) — the [`AxumWsConnection`] implementation.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::AxumWsConnection;

use std::fmt;

/// Opaque identifier for a connection. Distinct from
/// `quizroom_protocol::ConnectionId` — this one only needs to be unique
/// within this process's transport layer; the protocol-level id is what
/// rides on the wire and is assigned by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that can send and receive message frames.
///
/// Frames are opaque byte buffers — the protocol layer owns encoding.
/// Text frames are treated the same as binary: the browser client sends
/// JSON as WebSocket text frames, which decode identically to bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_equality() {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(1);
        let c = ConnectionId::new(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}
