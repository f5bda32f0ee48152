//! Integration tests for the quiz room server: a real WebSocket client
//! driving a locally bound instance of the full server over the wire.
//!
//! These go through `quizroom::run` on an ephemeral port rather than
//! reaching into the crate's private router-assembly helpers, so they
//! exercise the exact same path a browser client would.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quizroom::Config;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

async fn start_server() -> (std::net::SocketAddr, std::path::PathBuf) {
    let mut dir = std::env::temp_dir();
    dir.push(format!("quizroom-it-{}", uuid::Uuid::new_v4()));
    let config = Config::parse_from([
        "quizroom-server",
        "--bind",
        "127.0.0.1:0",
        "--snapshot-dir",
        dir.to_str().unwrap(),
    ]);
    let bind_addr = config.bind;
    tokio::spawn(quizroom::run(config));

    let mut attempts = 0;
    loop {
        if tokio::net::TcpStream::connect(bind_addr).await.is_ok() {
            break;
        }
        attempts += 1;
        assert!(attempts < 50, "server never started listening");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    (bind_addr, dir)
}

async fn next_json(
    stream: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> Value {
    loop {
        match stream.next().await.expect("stream ended").unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn create_room_then_join_roundtrips_over_the_socket() {
    let (bind_addr, dir) = start_server().await;

    let (mut gm_stream, _) =
        tokio_tungstenite::connect_async(format!("ws://{bind_addr}/ws?isGameMaster=true"))
            .await
            .unwrap();

    let first = next_json(&mut gm_stream).await;
    assert_eq!(first["type"], "persistent_id_assigned");
    assert!(first["httpToken"].is_null());

    gm_stream
        .send(Message::Text(
            json!({"type": "create_room", "isStreamerMode": false, "isPointsMode": false})
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

    let room_created = next_json(&mut gm_stream).await;
    assert_eq!(room_created["type"], "room_created");
    let code = room_created["code"].as_str().unwrap().to_string();

    let reassigned = next_json(&mut gm_stream).await;
    assert_eq!(reassigned["type"], "persistent_id_assigned");
    assert!(reassigned["httpToken"].is_string());

    let joined = next_json(&mut gm_stream).await;
    assert_eq!(joined["type"], "room_joined");
    assert_eq!(joined["code"], code);

    let (mut player_stream, _) =
        tokio_tungstenite::connect_async(format!("ws://{bind_addr}/ws")).await.unwrap();
    let _ = next_json(&mut player_stream).await;

    player_stream
        .send(Message::Text(
            json!({"type": "join_room", "code": code, "playerName": "Alice"})
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

    let player_token = next_json(&mut player_stream).await;
    assert_eq!(player_token["type"], "persistent_id_assigned");

    let player_joined = next_json(&mut player_stream).await;
    assert_eq!(player_joined["type"], "room_joined");
    let players = player_joined["state"]["players"].as_array().unwrap();
    assert!(players.iter().any(|p| p["displayName"] == "GameMaster"));

    tokio::fs::remove_dir_all(&dir).await.ok();
}

#[tokio::test]
async fn joining_an_unknown_room_code_returns_room_not_found() {
    let (bind_addr, dir) = start_server().await;

    let (mut stream, _) =
        tokio_tungstenite::connect_async(format!("ws://{bind_addr}/ws")).await.unwrap();
    let _ = next_json(&mut stream).await;

    stream
        .send(Message::Text(
            json!({"type": "join_room", "code": "ZZZZZZ", "playerName": "Bob"}).to_string().into(),
        ))
        .await
        .unwrap();

    let response = next_json(&mut stream).await;
    assert_eq!(response["type"], "room_not_found");
    assert_eq!(response["code"], "ZZZZZZ");

    tokio::fs::remove_dir_all(&dir).await.ok();
}

#[tokio::test]
async fn bare_reconnect_without_a_name_is_rejected_before_upgrade() {
    let (bind_addr, dir) = start_server().await;

    // No isInitialConnection/isGameMaster/displayName query params: the
    // handshake's acceptance policy rejects this before ever upgrading.
    let err = tokio_tungstenite::connect_async(format!(
        "ws://{bind_addr}/ws?persistentId=P-stale-unnamed"
    ))
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        tokio_tungstenite::tungstenite::Error::Http(response)
            if response.status() == axum::http::StatusCode::UNAUTHORIZED
    ));

    tokio::fs::remove_dir_all(&dir).await.ok();
}

#[tokio::test]
async fn debug_rooms_http_mirror_reflects_a_created_room() {
    let (bind_addr, dir) = start_server().await;

    let (mut gm_stream, _) =
        tokio_tungstenite::connect_async(format!("ws://{bind_addr}/ws?isGameMaster=true"))
            .await
            .unwrap();
    let _ = next_json(&mut gm_stream).await;
    gm_stream
        .send(Message::Text(json!({"type": "create_room"}).to_string().into()))
        .await
        .unwrap();
    let room_created = next_json(&mut gm_stream).await;
    let code = room_created["code"].as_str().unwrap().to_string();
    let _ = next_json(&mut gm_stream).await;
    let _ = next_json(&mut gm_stream).await;

    let body = http_get(bind_addr, "/debug/rooms").await;
    let rooms: Value = serde_json::from_str(&body).unwrap();
    assert!(rooms.as_array().unwrap().iter().any(|r| r["code"] == code));

    tokio::fs::remove_dir_all(&dir).await.ok();
}

#[tokio::test]
async fn submitting_an_answer_appends_an_analytics_record_visible_over_http() {
    let (bind_addr, dir) = start_server().await;

    let (mut gm_stream, _) =
        tokio_tungstenite::connect_async(format!("ws://{bind_addr}/ws?isGameMaster=true"))
            .await
            .unwrap();
    let _ = next_json(&mut gm_stream).await;
    gm_stream
        .send(Message::Text(json!({"type": "create_room"}).to_string().into()))
        .await
        .unwrap();
    let room_created = next_json(&mut gm_stream).await;
    let code = room_created["code"].as_str().unwrap().to_string();
    let _ = next_json(&mut gm_stream).await; // persistent_id_assigned (with token)
    let _ = next_json(&mut gm_stream).await; // room_joined

    let (mut player_stream, _) =
        tokio_tungstenite::connect_async(format!("ws://{bind_addr}/ws")).await.unwrap();
    let _ = next_json(&mut player_stream).await;
    player_stream
        .send(Message::Text(
            json!({"type": "join_room", "code": code, "playerName": "Alice"}).to_string().into(),
        ))
        .await
        .unwrap();
    let _ = next_json(&mut player_stream).await; // persistent_id_assigned
    let _ = next_json(&mut player_stream).await; // room_joined
    let _ = next_json(&mut gm_stream).await; // player_joined broadcast to gm

    gm_stream
        .send(Message::Text(
            json!({
                "type": "start_game",
                "code": code,
                "questions": [{"id": "q1", "text": "2+2?", "type": "text", "answer": "4", "grade": 1}],
            })
            .to_string()
            .into(),
        ))
        .await
        .unwrap();
    let _ = next_json(&mut gm_stream).await; // game_started
    let _ = next_json(&mut player_stream).await; // game_started

    player_stream
        .send(Message::Text(
            json!({"type": "submit_answer", "code": code, "answer": "4"}).to_string().into(),
        ))
        .await
        .unwrap();

    let mut records = Vec::new();
    for _ in 0..50 {
        let body = http_get(bind_addr, &format!("/api/analytics/game/{code}")).await;
        records = serde_json::from_str::<Value>(&body).unwrap().as_array().cloned().unwrap_or_default();
        if !records.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(
        records.iter().any(|r| r["kind"] == "answerSubmitted"),
        "expected an answerSubmitted analytics record, got {records:?}"
    );

    tokio::fs::remove_dir_all(&dir).await.ok();
}

/// Bare HTTP/1.1 GET over a plain TCP stream, reading until the peer
/// closes the connection. Good enough for a test that only needs the
/// response body; no need for a full HTTP client dependency.
async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response.split("\r\n\r\n").nth(1).unwrap_or_default().to_string()
}
