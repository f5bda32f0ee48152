//! `Connection` implementation over an already-upgraded Axum WebSocket.
//!
//! The HTTP surface (CORS, recap/analytics mirror routes) and the
//! realtime event stream share one `axum::serve` listener; the ws route
//! handler upgrades the connection and hands the resulting
//! [`axum::extract::ws::WebSocket`] to [`AxumWsConnection::new`], which
//! splits it into a send half and a recv half so `send`/`recv` can be
//! called concurrently from the connection's reader and writer tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{stream::SplitSink, stream::SplitStream, SinkExt, StreamExt};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A single upgraded WebSocket connection, wrapped behind the
/// transport-agnostic [`Connection`] trait.
pub struct AxumWsConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
}

impl AxumWsConnection {
    /// Wraps an upgraded socket, minting a fresh transport-local id.
    pub fn new(socket: WebSocket) -> Arc<Self> {
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        let (sink, stream) = socket.split();
        tracing::debug!(%id, "accepted WebSocket connection");
        Arc::new(Self {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

impl Connection for AxumWsConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let text = String::from_utf8_lossy(data).into_owned();
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
