//! WebSocket handshake, per-connection event loop, and room-entry
//! handling (spec §4.1, §6.2).
//!
//! Each accepted connection gets its own task running
//! [`handle_socket`]. Identity resolution happens once, before the
//! upgrade completes, so a rejected handshake never opens a socket at
//! all. Everything after that is a single read loop: `CreateRoom`,
//! `JoinRoom`, and `RejoinRoom` bind this connection to a room (the only
//! three events the handler itself understands); every other event is
//! opaque and forwarded straight to the bound room's actor.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use quizroom_protocol::{
    ClientEvent, Codec, JsonCodec, PersistentId, ProtocolError, RoomCode, ServerEvent,
};
use quizroom_room::{RoomError, RoomHandle};
use quizroom_session::identity::{self, HandshakeParams, ParticipantRole};
use quizroom_transport::{AxumWsConnection, Connection};
use rand::Rng;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::analytics::AnalyticsRecord;
use crate::server::SharedState;

/// Per-event payload cap (spec §7's `RateOrSizeLimit`).
const MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    #[serde(default)]
    is_game_master: bool,
    #[serde(default)]
    is_initial_connection: bool,
    persistent_id: Option<String>,
    display_name: Option<String>,
}

/// `GET /ws` — resolves identity from the query string before upgrading;
/// a rejected handshake gets a plain 401 and never opens a socket.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let params = HandshakeParams {
        auth_persistent_id: query.persistent_id.map(PersistentId),
        auth_display_name: query.display_name,
        is_game_master: query.is_game_master,
        is_initial_connection: query.is_initial_connection,
        recovered_by_transport: false,
    };

    let resolved = match identity::resolve(&params) {
        Ok(resolved) => resolved,
        Err(err) => return (StatusCode::UNAUTHORIZED, err.to_string()).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, resolved))
}

/// Per-connection state that the event loop mutates as it learns which
/// room and seat this connection is bound to.
struct ConnectionContext {
    pid: PersistentId,
    role: ParticipantRole,
    display_name: String,
    room: Option<RoomHandle>,
}

async fn handle_socket(
    socket: axum::extract::ws::WebSocket,
    state: SharedState,
    resolved: identity::ResolvedIdentity,
) {
    let conn = AxumWsConnection::new(socket);
    let codec = JsonCodec;
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer_conn = conn.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = outbox_rx.recv().await {
            if let Ok(bytes) = codec.encode(&event) {
                if writer_conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        }
    });

    let initial = ServerEvent::PersistentIdAssigned {
        persistent_id: resolved.persistent_id.clone(),
        http_token: None,
    };
    if let Ok(bytes) = codec.encode(&initial) {
        let _ = conn.send(&bytes).await;
    }

    let mut ctx = ConnectionContext {
        pid: resolved.persistent_id,
        role: resolved.role,
        display_name: resolved.display_name,
        room: None,
    };

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) | Err(_) => break,
        };

        if frame.len() > MAX_PAYLOAD_BYTES {
            send_error(&conn, &codec, "payload exceeds the 5 MB per-event cap").await;
            continue;
        }

        let event: ClientEvent = match codec.decode(&frame) {
            Ok(event) => event,
            Err(ProtocolError::Decode(err)) => {
                send_error(&conn, &codec, &format!("malformed event: {err}")).await;
                continue;
            }
            Err(err) => {
                send_error(&conn, &codec, &err.to_string()).await;
                continue;
            }
        };

        match event {
            ClientEvent::CreateRoom { code, is_streamer_mode, is_points_mode } => {
                handle_create_room(
                    &state,
                    &conn,
                    &codec,
                    &outbox_tx,
                    &mut ctx,
                    code,
                    is_streamer_mode.unwrap_or(false),
                    is_points_mode.unwrap_or(false),
                )
                .await;
            }
            ClientEvent::JoinRoom { code, player_name, is_spectator, avatar } => {
                handle_join_room(
                    &state,
                    &conn,
                    &codec,
                    &outbox_tx,
                    &mut ctx,
                    code,
                    player_name,
                    is_spectator.unwrap_or(false),
                    avatar,
                )
                .await;
            }
            ClientEvent::RejoinRoom { code, is_game_master, persistent_player_id, avatar } => {
                handle_rejoin_room(
                    &state,
                    &conn,
                    &codec,
                    &outbox_tx,
                    &mut ctx,
                    code,
                    is_game_master.unwrap_or(false),
                    persistent_player_id,
                    avatar,
                )
                .await;
            }
            other => match &ctx.room {
                Some(handle) => {
                    let pending = pending_analytics_record(&ctx.pid, &other);
                    match handle.dispatch(ctx.pid.clone(), other).await {
                        Ok(()) => record_analytics(&state, handle, pending).await,
                        Err(err) => send_error(&conn, &codec, &err.to_string()).await,
                    }
                }
                None => send_error(&conn, &codec, "join or create a room first").await,
            },
        }
    }

    if let Some(handle) = ctx.room {
        handle.disconnect_abrupt(ctx.pid).await;
    }
    writer.abort();
}

#[allow(clippy::too_many_arguments)]
async fn handle_create_room(
    state: &SharedState,
    conn: &std::sync::Arc<AxumWsConnection>,
    codec: &JsonCodec,
    outbox_tx: &mpsc::UnboundedSender<ServerEvent>,
    ctx: &mut ConnectionContext,
    code: Option<RoomCode>,
    is_streamer_mode: bool,
    is_points_mode: bool,
) {
    ctx.role = ParticipantRole::GameMaster;
    let handle = state
        .registry
        .create(code, ctx.pid.clone(), ctx.display_name.clone(), is_streamer_mode, is_points_mode)
        .await;
    let room_code = handle.code().clone();

    let snapshot = match handle
        .join(
            ctx.pid.clone(),
            quizroom_session::ParticipantRole::GameMaster,
            ctx.display_name.clone(),
            false,
            None,
            outbox_tx.clone(),
        )
        .await
    {
        Ok(snapshot) => snapshot,
        Err(err) => {
            send_error(conn, codec, &err.to_string()).await;
            return;
        }
    };

    let token = mint_token(state, room_code.clone(), ctx.pid.clone()).await;
    let _ = state
        .snapshots
        .append_critical_event(crate::snapshot::CriticalEvent::RoomCreated {
            code: room_code.clone(),
            at: Utc::now(),
        })
        .await;

    send(conn, codec, &ServerEvent::RoomCreated { code: room_code.clone() }).await;
    send(
        conn,
        codec,
        &ServerEvent::PersistentIdAssigned { persistent_id: ctx.pid.clone(), http_token: Some(token) },
    )
    .await;
    send(conn, codec, &ServerEvent::RoomJoined { code: room_code, state: snapshot }).await;

    ctx.room = Some(handle);
}

#[allow(clippy::too_many_arguments)]
async fn handle_join_room(
    state: &SharedState,
    conn: &std::sync::Arc<AxumWsConnection>,
    codec: &JsonCodec,
    outbox_tx: &mpsc::UnboundedSender<ServerEvent>,
    ctx: &mut ConnectionContext,
    code: RoomCode,
    player_name: String,
    is_spectator: bool,
    avatar: Option<String>,
) {
    let Some(handle) = state.registry.lookup(&code).await else {
        send(conn, codec, &ServerEvent::RoomNotFound { code }).await;
        return;
    };

    ctx.role = ParticipantRole::Player;
    ctx.display_name = player_name.clone();

    let snapshot = match handle
        .join(
            ctx.pid.clone(),
            quizroom_session::ParticipantRole::Player,
            player_name,
            is_spectator,
            avatar,
            outbox_tx.clone(),
        )
        .await
    {
        Ok(snapshot) => snapshot,
        Err(err) => {
            send_error(conn, codec, &err.to_string()).await;
            return;
        }
    };

    let token = mint_token(state, code.clone(), ctx.pid.clone()).await;
    send(
        conn,
        codec,
        &ServerEvent::PersistentIdAssigned { persistent_id: ctx.pid.clone(), http_token: Some(token) },
    )
    .await;
    send(conn, codec, &ServerEvent::RoomJoined { code, state: snapshot }).await;

    ctx.room = Some(handle);
}

#[allow(clippy::too_many_arguments)]
async fn handle_rejoin_room(
    state: &SharedState,
    conn: &std::sync::Arc<AxumWsConnection>,
    codec: &JsonCodec,
    outbox_tx: &mpsc::UnboundedSender<ServerEvent>,
    ctx: &mut ConnectionContext,
    code: RoomCode,
    is_game_master: bool,
    persistent_player_id: Option<PersistentId>,
    avatar: Option<String>,
) {
    let Some(handle) = state.registry.lookup(&code).await else {
        send(conn, codec, &ServerEvent::RoomNotFound { code }).await;
        return;
    };

    let pid = persistent_player_id.unwrap_or_else(|| ctx.pid.clone());
    let role = if is_game_master {
        ParticipantRole::GameMaster
    } else {
        ParticipantRole::Player
    };
    ctx.pid = pid.clone();
    ctx.role = role;

    let session_role = if is_game_master {
        quizroom_session::ParticipantRole::GameMaster
    } else {
        quizroom_session::ParticipantRole::Player
    };

    let snapshot = match handle
        .join(pid.clone(), session_role, ctx.display_name.clone(), false, avatar, outbox_tx.clone())
        .await
    {
        Ok(snapshot) => snapshot,
        Err(err) => {
            send_error(conn, codec, &err.to_string()).await;
            return;
        }
    };

    let token = mint_token(state, code.clone(), pid.clone()).await;
    send(
        conn,
        codec,
        &ServerEvent::PersistentIdAssigned { persistent_id: pid, http_token: Some(token) },
    )
    .await;
    send(conn, codec, &ServerEvent::RoomJoined { code, state: snapshot }).await;

    ctx.room = Some(handle);
}

/// Mints and stores a bearer token scoped to `(roomCode, persistentId)`
/// for the HTTP mirror routes (SPEC_FULL.md §C).
async fn mint_token(state: &SharedState, code: RoomCode, pid: PersistentId) -> String {
    let token: String = {
        let mut rng = rand::rng();
        (0..32).map(|_| format!("{:x}", rng.random_range(0..16u8))).collect()
    };
    state.http_tokens.write().await.insert(token.clone(), (code, pid));
    token
}

/// Which analytics record a dispatched event will produce once it
/// succeeds, decided up front since `dispatch` consumes the event
/// (spec §2.8's append-only activity log).
enum PendingAnalytics {
    AnswerSubmitted { persistent_id: PersistentId },
    AnswerEvaluated { target: PersistentId, is_correct: bool },
    RoundAdvanced,
    GameConcluded,
}

fn pending_analytics_record(caller: &PersistentId, event: &ClientEvent) -> Option<PendingAnalytics> {
    match event {
        ClientEvent::SubmitAnswer { .. } => {
            Some(PendingAnalytics::AnswerSubmitted { persistent_id: caller.clone() })
        }
        ClientEvent::EvaluateAnswer { player_id, is_correct, .. } => {
            Some(PendingAnalytics::AnswerEvaluated { target: player_id.clone(), is_correct: *is_correct })
        }
        ClientEvent::NextQuestion { .. } => Some(PendingAnalytics::RoundAdvanced),
        ClientEvent::GmEndGameRequest { .. } => Some(PendingAnalytics::GameConcluded),
        _ => None,
    }
}

/// Appends the analytics record decided by [`pending_analytics_record`],
/// once the dispatch it was derived from has actually succeeded. Reads
/// the room's current round index back off its summary rather than
/// threading it through `dispatch`'s `Result<(), RoomError>`.
async fn record_analytics(state: &SharedState, handle: &RoomHandle, pending: Option<PendingAnalytics>) {
    let Some(pending) = pending else { return };
    let Ok(summary) = handle.summary().await else { return };
    let at = Utc::now();
    let record = match pending {
        PendingAnalytics::AnswerSubmitted { persistent_id } => {
            AnalyticsRecord::AnswerSubmitted { room_code: summary.code, persistent_id, at }
        }
        PendingAnalytics::AnswerEvaluated { target, is_correct } => {
            AnalyticsRecord::AnswerEvaluated { room_code: summary.code, target, is_correct, at }
        }
        PendingAnalytics::RoundAdvanced => {
            AnalyticsRecord::RoundAdvanced { room_code: summary.code, round_index: summary.current_round_index, at }
        }
        PendingAnalytics::GameConcluded => AnalyticsRecord::GameConcluded { room_code: summary.code, at },
    };
    state.analytics.record(record).await;
}

async fn send(conn: &std::sync::Arc<AxumWsConnection>, codec: &JsonCodec, event: &ServerEvent) {
    if let Ok(bytes) = codec.encode(event) {
        let _ = conn.send(&bytes).await;
    }
}

async fn send_error(conn: &std::sync::Arc<AxumWsConnection>, codec: &JsonCodec, message: &str) {
    send(conn, codec, &ServerEvent::Error { message: message.to_string() }).await;
}

/// Maps a [`RoomError`] onto the closest HTTP status, for the mirror
/// routes in `crate::http` (spec §7's error-kind taxonomy).
pub(crate) fn room_error_status(err: &RoomError) -> StatusCode {
    match err {
        RoomError::RoomNotFound(_) | RoomError::ParticipantNotFound(_) => StatusCode::NOT_FOUND,
        RoomError::Unauthorized => StatusCode::FORBIDDEN,
        RoomError::NameTaken(_) | RoomError::AlreadyConnected(_) | RoomError::DuplicateSubmission => {
            StatusCode::CONFLICT
        }
        RoomError::SubmissionPhaseOver
        | RoomError::NotStarted
        | RoomError::NotCommunityVotingMode
        | RoomError::CommunityVotingModeActive
        | RoomError::IsSpectator
        | RoomError::NotActive
        | RoomError::SelfVote
        | RoomError::DuplicateVote
        | RoomError::NoNextQuestion
        | RoomError::AlreadyConcluded
        | RoomError::GameAlreadyStarted => StatusCode::UNPROCESSABLE_ENTITY,
        RoomError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        RoomError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}
