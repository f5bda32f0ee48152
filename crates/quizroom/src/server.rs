//! Shared application state and router assembly.
//!
//! The HTTP surface (CORS, recap/analytics mirror routes) and the
//! realtime WebSocket stream share one `axum::serve` listener, per
//! spec §6.3 — a single concrete `axum::Router` rather than a generic
//! server type parameterized over game/auth/config.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use quizroom_protocol::{PersistentId, RoomCode};
use quizroom_room::{RoomRegistry, RoomRegistryConfig};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analytics::AnalyticsSink;
use crate::config::Config;
use crate::handler;
use crate::http as mirror;
use crate::recap_store::RecapStore;
use crate::snapshot::{CriticalEvent, SnapshotStore};

/// A bearer token minted at join/create time, scoped to one
/// `(roomCode, persistentId)` pair, used to authorize the HTTP mirror
/// routes in place of a spoofable connection-id header (SPEC_FULL.md §C).
pub type HttpTokens = RwLock<HashMap<String, (RoomCode, PersistentId)>>;

pub struct AppState {
    pub config: Config,
    pub registry: RoomRegistry,
    pub snapshots: SnapshotStore,
    pub analytics: AnalyticsSink,
    pub recaps: RecapStore,
    pub http_tokens: HttpTokens,
}

pub type SharedState = Arc<AppState>;

/// Builds the shared state: loads any snapshot from disk and restores
/// its rooms into a fresh registry before the server starts accepting
/// connections (spec §4.5's bootstrap load).
pub async fn build_state(config: Config) -> SharedState {
    let snapshots = SnapshotStore::new(config.snapshot_path(), config.critical_log_path());
    let registry = RoomRegistry::new(RoomRegistryConfig {
        stale_after: config.sweep_interval().max(Duration::from_secs(3600)),
        ..RoomRegistryConfig::default()
    });

    let restored = snapshots.load().await;
    let restored_count = restored.len();
    for state in restored.into_values() {
        registry.restore(state).await;
    }
    if restored_count > 0 {
        tracing::info!(count = restored_count, "restored rooms from snapshot");
    }

    let analytics = AnalyticsSink::new(config.analytics_log_path());
    let recaps = RecapStore::load(config.recap_archive_path()).await;

    Arc::new(AppState {
        config,
        registry,
        snapshots,
        analytics,
        recaps,
        http_tokens: RwLock::new(HashMap::new()),
    })
}

pub fn build_router(state: SharedState) -> Router {
    let cors = if state.config.cors_origins.is_empty() {
        CorsLayer::new()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    };

    Router::new()
        .route("/ws", get(handler::ws_handler))
        .route("/debug/rooms", get(mirror::debug_rooms))
        .route("/api/recaps", get(mirror::list_recaps))
        .route("/api/recaps/:id", get(mirror::get_recap))
        .route("/api/recaps/room/:code", get(mirror::get_recaps_for_room))
        .route("/api/recaps/:id/round/:n", get(mirror::get_recap_round))
        .route("/api/analytics/game/:code", get(mirror::get_analytics_for_room))
        .route("/api/room/:code/players", get(mirror::get_room_players))
        .route("/api/room/:code/board", post(mirror::post_room_board))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the server until the listener is closed: binds, assembles the
/// router, spawns the background snapshot/sweep tasks, and serves.
pub async fn run(config: Config) -> Result<(), crate::error::QuizRoomError> {
    let bind_addr = config.bind;
    let snapshot_interval = config.snapshot_interval();
    let sweep_interval = config.sweep_interval();

    // Fail fast on startup if the snapshot directory can't be created —
    // a missing/corrupt *file* inside it is fine (load fails open), but
    // an inaccessible *directory* means every later export would fail
    // silently for the life of the process (spec §6.3's exit-code rule).
    tokio::fs::create_dir_all(&config.snapshot_dir)
        .await
        .map_err(crate::error::QuizRoomError::Snapshot)?;

    let state = build_state(config).await;
    let app = build_router(state.clone());

    spawn_snapshot_task(state.clone(), snapshot_interval);
    spawn_sweep_task(state.clone(), sweep_interval);
    spawn_recap_archive_task(state.clone(), RECAP_ARCHIVE_INTERVAL);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|err| crate::error::QuizRoomError::Bind(bind_addr, err))?;
    tracing::info!(%bind_addr, "quizroom server listening");

    axum::serve(listener, app)
        .await
        .map_err(|err| crate::error::QuizRoomError::Bind(bind_addr, err))
}

fn spawn_snapshot_task(state: SharedState, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = state.snapshots.save_all(&state.registry).await {
                tracing::warn!(error = %err, "periodic snapshot export failed");
            }
        }
    });
}

/// Not a spec-named cadence — just frequent enough that the `/api/recaps`
/// mirror reflects a just-concluded game without waiting for the next
/// 30-minute stale sweep.
const RECAP_ARCHIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Archives the recap of every concluded room still held by the registry,
/// then drops it from the registry (spec §3's "(c) explicit GM end-game
/// after recap broadcast" destruction path). Already-connected sockets
/// keep their `RoomHandle` and can still page through the recap via
/// `gm_navigate_recap_*`; the actor itself only exits once those
/// disconnect, per `RoomActor::run`'s `Concluded && senders.is_empty()`
/// check.
fn spawn_recap_archive_task(state: SharedState, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            for handle in state.registry.all().await {
                let Ok(summary) = handle.summary().await else {
                    continue;
                };
                if !summary.concluded {
                    continue;
                }
                let Ok(recap) = handle.recap().await else {
                    continue;
                };
                state.recaps.archive(summary.code.clone(), recap).await;
                state.registry.remove(&summary.code).await;
                tracing::info!(code = %summary.code, "archived recap for concluded room");
            }
        }
    });
}

fn spawn_sweep_task(state: SharedState, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = state.registry.sweep_stale().await;
            for code in evicted {
                tracing::info!(%code, "evicted stale room");
                let _ = state
                    .snapshots
                    .append_critical_event(CriticalEvent::RoomEvicted { code, at: chrono::Utc::now() })
                    .await;
            }
        }
    });
}
