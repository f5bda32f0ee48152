//! Read-only HTTP mirror routes plus the one bearer-authorized mutation
//! route, alongside the realtime WebSocket stream (spec §6.3, §6.4).
//!
//! These never go through a room's event vocabulary — they read the
//! registry/recap archive/analytics log directly, or (for the one
//! mutation) dispatch straight into the room actor the same way a
//! socket event would.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use quizroom_protocol::{ClientEvent, RoomCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::server::SharedState;

#[derive(Debug, Serialize)]
struct RoomDebugEntry {
    code: String,
    started: bool,
    concluded: bool,
    player_count: usize,
    last_activity: chrono::DateTime<chrono::Utc>,
}

/// `GET /debug/rooms` — a point-in-time dump of every live room's summary.
pub async fn debug_rooms(State(state): State<SharedState>) -> Json<Vec<RoomDebugEntry>> {
    let mut entries = Vec::new();
    for handle in state.registry.all().await {
        if let Ok(summary) = handle.summary().await {
            entries.push(RoomDebugEntry {
                code: summary.code.0,
                started: summary.started,
                concluded: summary.concluded,
                player_count: summary.player_count,
                last_activity: summary.last_activity,
            });
        }
    }
    Json(entries)
}

/// `GET /api/recaps` — every archived recap, most recent first.
pub async fn list_recaps(State(state): State<SharedState>) -> Json<Vec<crate::recap_store::StoredRecap>> {
    let mut recaps = state.recaps.all();
    recaps.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
    Json(recaps)
}

/// `GET /api/recaps/:id`
pub async fn get_recap(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::recap_store::StoredRecap>, StatusCode> {
    state.recaps.by_id(id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// `GET /api/recaps/room/:code`
pub async fn get_recaps_for_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Json<Vec<crate::recap_store::StoredRecap>> {
    Json(state.recaps.by_room_code(&RoomCode(code)))
}

/// `GET /api/recaps/:id/round/:n` — a single round out of an archived
/// recap, for clients that only want to page through one round at a time.
pub async fn get_recap_round(
    State(state): State<SharedState>,
    Path((id, n)): Path<(Uuid, usize)>,
) -> Result<Json<quizroom_protocol::RecapRound>, StatusCode> {
    let stored = state.recaps.by_id(id).ok_or(StatusCode::NOT_FOUND)?;
    stored
        .recap
        .rounds
        .get(n)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `GET /api/analytics/game/:code`
pub async fn get_analytics_for_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Json<Vec<crate::analytics::AnalyticsRecord>> {
    Json(state.analytics.read_for_room(&RoomCode(code)).await)
}

/// `GET /api/room/:code/players` — a read-only player roster, used by
/// dashboards that don't want to hold open a WebSocket just to watch a
/// room's participant list (spec §6.3).
pub async fn get_room_players(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<quizroom_protocol::Participant>>, StatusCode> {
    let handle = state
        .registry
        .lookup(&RoomCode(code))
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let persisted = handle
        .export()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(persisted.participants))
}

#[derive(Debug, Deserialize)]
pub struct BoardBody {
    board_data: String,
}

/// `POST /api/room/:code/board` — the HTTP mirror of `update_game_master_board`
/// (spec §6.3), bearer-authorized against the token minted at join time so
/// a caller can't push a board update into a room they never joined.
pub async fn post_room_board(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: axum::http::HeaderMap,
    Json(body): Json<BoardBody>,
) -> Response {
    let code = RoomCode(code);
    let Some(caller) = authorize(&state, &headers, &code).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let Some(handle) = state.registry.lookup(&code).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match handle
        .dispatch(
            caller,
            ClientEvent::UpdateGameMasterBoard { code, board_data: body.board_data },
        )
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => crate::handler::room_error_status(&err).into_response(),
    }
}

/// Validates the `Authorization: Bearer <token>` header against the
/// tokens minted for this room, returning the caller it authorizes.
async fn authorize(
    state: &SharedState,
    headers: &axum::http::HeaderMap,
    code: &RoomCode,
) -> Option<quizroom_protocol::PersistentId> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))?;

    let tokens = state.http_tokens.read().await;
    let (token_code, pid) = tokens.get(token)?;
    if token_code == code {
        Some(pid.clone())
    } else {
        None
    }
}
