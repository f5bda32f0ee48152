//! Room registry: creates, looks up, and evicts rooms (spec §4.2).
//!
//! Cross-room code (the registry, the signaling relay, the HTTP mirror)
//! only ever acquires this map's lock; per-room mutation is serialized
//! inside each room's own actor (`crate::room`), never here.

use std::collections::HashMap;
use std::time::Duration;

use quizroom_protocol::{PersistentId, RoomCode};
use rand::Rng;
use tokio::sync::RwLock;

use crate::persist::RoomPersistedState;
use crate::room::{spawn_room, spawn_room_from_persisted, RoomHandle};
use crate::RoomConfig;

/// Default stale-room threshold: rooms with no activity in this long are
/// evicted by the sweep (spec §4.2).
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone)]
pub struct RoomRegistryConfig {
    pub room_config: RoomConfig,
    pub stale_after: Duration,
}

impl Default for RoomRegistryConfig {
    fn default() -> Self {
        Self {
            room_config: RoomConfig::default(),
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

/// The process-wide map from [`RoomCode`] to a running room actor.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
    config: RoomRegistryConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomRegistryConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// `createRoom` (spec §4.2, §4.3). If `code` is supplied and already
    /// registered, the room is reclaimed for the new GM rather than
    /// rejected: GM identity is minted fresh every session (spec §4.1),
    /// so matching by explicit code is the only reclaim path available
    /// to a GM whose socket dropped. The caller still has to `joinRoom`
    /// against the returned handle afterward to bind a sender.
    pub async fn create(
        &self,
        code: Option<RoomCode>,
        gm_persistent_id: PersistentId,
        gm_display_name: String,
        is_streamer_mode: bool,
        is_points_mode: bool,
    ) -> RoomHandle {
        let mut rooms = self.rooms.write().await;

        let code = match code {
            Some(code) if rooms.contains_key(&code) => {
                let existing = rooms.get(&code).expect("just checked contains_key");
                let _ = existing.reclaim_gm(gm_persistent_id, gm_display_name).await;
                return existing.clone();
            }
            Some(code) => code,
            None => Self::mint_code(&rooms),
        };

        let handle = spawn_room(
            code.clone(),
            gm_persistent_id,
            gm_display_name,
            is_streamer_mode,
            is_points_mode,
            self.config.room_config.clone(),
        );
        rooms.insert(code, handle.clone());
        handle
    }

    fn mint_code(existing: &HashMap<RoomCode, RoomHandle>) -> RoomCode {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..RoomCode::LENGTH)
                .map(|_| {
                    let idx = rng.random_range(0..RoomCode::ALPHABET.len());
                    RoomCode::ALPHABET[idx] as char
                })
                .collect();
            let code = RoomCode(code);
            if !existing.contains_key(&code) {
                return code;
            }
        }
    }

    pub async fn lookup(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.read().await.get(code).cloned()
    }

    pub async fn remove(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.write().await.remove(code)
    }

    /// Bootstrap load (spec §4.5): re-registers a room restored from a
    /// disk snapshot. The caller is responsible for discarding snapshots
    /// older than 24h before calling this.
    pub async fn restore(&self, state: RoomPersistedState) -> RoomHandle {
        let code = state.code.clone();
        let handle = spawn_room_from_persisted(state, self.config.room_config.clone());
        self.rooms.write().await.insert(code, handle.clone());
        handle
    }

    /// All currently registered room handles — used by the snapshot
    /// store's periodic export and the debug room dump.
    pub async fn all(&self) -> Vec<RoomHandle> {
        self.rooms.read().await.values().cloned().collect()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Stale sweep (spec §4.2): invoked every 30 minutes by the caller.
    /// Removes rooms whose last activity is older than `stale_after`
    /// (default 24h) or whose actor has already failed to respond — e.g.
    /// a GM-disconnect-expiry conclude already evicted every socket and
    /// the room self-terminated (the GM and player grace windows both
    /// expire well inside this sweep's 30-minute interval, so this is a
    /// safety net over that path, not the primary eviction mechanism).
    pub async fn sweep_stale(&self) -> Vec<RoomCode> {
        let mut rooms = self.rooms.write().await;
        let mut stale = Vec::new();
        for (code, handle) in rooms.iter() {
            match handle.summary().await {
                Ok(summary) => {
                    let elapsed = chrono::Utc::now().signed_duration_since(summary.last_activity);
                    let age = elapsed.to_std().unwrap_or(Duration::ZERO);
                    if age > self.config.stale_after {
                        stale.push(code.clone());
                    }
                }
                Err(_) => stale.push(code.clone()),
            }
        }
        for code in &stale {
            rooms.remove(code);
        }
        stale
    }
}
