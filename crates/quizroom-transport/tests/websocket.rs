//! Integration tests for the Axum-backed WebSocket transport.
//!
//! Spins up a real Axum server with one upgrade route, captures the
//! server-side `AxumWsConnection` through a channel, and drives it from
//! a `tokio-tungstenite` client to verify frames actually flow over the
//! network.

#![cfg(feature = "websocket")]

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use quizroom_transport::{AxumWsConnection, Connection};
use tokio::sync::mpsc;

type ConnTx = mpsc::UnboundedSender<Arc<AxumWsConnection>>;

async fn ws_handler(ws: WebSocketUpgrade, State(tx): State<ConnTx>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let conn = AxumWsConnection::new(socket);
        let _ = tx.send(conn);
        // Keep the task alive so the split halves stay readable/writable;
        // the test holds the `Arc` and drives send/recv directly.
        std::future::pending::<()>().await;
    })
}

async fn spawn_server() -> (std::net::SocketAddr, mpsc::UnboundedReceiver<Arc<AxumWsConnection>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route("/ws", get(ws_handler)).with_state(tx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, rx)
}

#[tokio::test]
async fn test_websocket_accept_and_send_receive() {
    let (addr, mut rx) = spawn_server().await;

    let url = format!("ws://{addr}/ws");
    let (mut client_ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("client should connect");

    let server_conn = rx.recv().await.expect("server should accept a connection");
    assert!(server_conn.id().into_inner() > 0);

    // --- Server sends, client receives ---
    server_conn
        .send(b"hello from server")
        .await
        .expect("send should succeed");

    use futures_util::StreamExt;
    let msg = client_ws.next().await.unwrap().unwrap();
    assert_eq!(msg.into_data().as_ref(), b"hello from server");

    // --- Client sends, server receives ---
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;
    client_ws
        .send(Message::Text("hello from client".into()))
        .await
        .unwrap();

    let received = server_conn
        .recv()
        .await
        .expect("recv should succeed")
        .expect("should have data");
    assert_eq!(received, b"hello from client");

    server_conn.close().await.expect("close should succeed");
}

#[tokio::test]
async fn test_websocket_recv_returns_none_on_client_close() {
    let (addr, mut rx) = spawn_server().await;

    let url = format!("ws://{addr}/ws");
    let (client_ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("client should connect");

    let server_conn = rx.recv().await.expect("server should accept a connection");

    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;
    let mut client_ws = client_ws;
    client_ws.send(Message::Close(None)).await.unwrap();

    let result = server_conn.recv().await.expect("recv should not error");
    assert!(result.is_none(), "should return None on client close");
}
