//! Snapshot store: periodic and critical-event persistence of live room
//! state to disk, and the bootstrap load on startup (spec §4.5, §6.4).
//!
//! There is no message bus or external database here — this is a single
//! process serving a best-effort realtime service (spec §1), so the
//! store is plain `tokio::fs` JSON writes. A crash between the write and
//! the rename loses at most one export interval's worth of state; that
//! is an accepted tradeoff, not a bug.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quizroom_protocol::RoomCode;
use quizroom_room::{RoomPersistedState, RoomRegistry};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// One entry in the append-only critical-event log — the record of
/// room-lifecycle moments the periodic export alone could miss between
/// intervals (spec §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CriticalEvent {
    RoomCreated { code: RoomCode, at: DateTime<Utc> },
    GmDisconnected { code: RoomCode, at: DateTime<Utc> },
    RoomEvicted { code: RoomCode, at: DateTime<Utc> },
}

pub struct SnapshotStore {
    snapshot_path: PathBuf,
    critical_log_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(snapshot_path: PathBuf, critical_log_path: PathBuf) -> Self {
        Self { snapshot_path, critical_log_path }
    }

    /// Bootstrap load (spec §4.5): reads the last periodic export and
    /// discards any room whose `savedAt` is more than 24h old. Fails open
    /// to an empty map on any I/O or parse error — a missing or corrupt
    /// snapshot file should never block startup.
    pub async fn load(&self) -> HashMap<RoomCode, RoomPersistedState> {
        let bytes = match tokio::fs::read(&self.snapshot_path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                tracing::warn!(error = %err, path = %self.snapshot_path.display(), "failed to read snapshot file");
                return HashMap::new();
            }
        };

        let rooms: HashMap<RoomCode, RoomPersistedState> = match serde_json::from_slice(&bytes) {
            Ok(rooms) => rooms,
            Err(err) => {
                tracing::warn!(error = %err, "snapshot file is corrupt, starting with no restored rooms");
                return HashMap::new();
            }
        };

        let now = Utc::now();
        let max_age = chrono::Duration::hours(24);
        rooms
            .into_iter()
            .filter(|(_, state)| now.signed_duration_since(state.saved_at) <= max_age)
            .collect()
    }

    /// Exports every live (non-concluded) room in the registry, writing
    /// to a temp file and renaming over the target so a reader never
    /// observes a half-written document.
    pub async fn save_all(&self, registry: &RoomRegistry) -> std::io::Result<()> {
        let mut rooms = HashMap::new();
        for handle in registry.all().await {
            if let Ok(Some(state)) = handle.export().await {
                rooms.insert(handle.code().clone(), state);
            }
        }
        self.write_atomic(&self.snapshot_path, &rooms).await
    }

    /// Appends one critical-event record (spec §6.4's second log).
    pub async fn append_critical_event(&self, event: CriticalEvent) -> std::io::Result<()> {
        append_json_line(&self.critical_log_path, &event).await
    }

    async fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, path).await
    }
}

/// Appends one JSON-serialized value as a single line, creating the
/// parent directory and the file if they don't exist yet.
pub(crate) async fn append_json_line<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizroom_room::{RoomConfig, RoomRegistryConfig};

    fn tmp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("quizroom-snapshot-test-{}", uuid::Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn load_on_missing_file_returns_empty_map() {
        let dir = tmp_dir();
        let store = SnapshotStore::new(dir.join("rooms.json"), dir.join("events.jsonl"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_all_then_load_round_trips_a_live_room() {
        use quizroom_protocol::PersistentId;

        let dir = tmp_dir();
        let store = SnapshotStore::new(dir.join("rooms.json"), dir.join("events.jsonl"));
        let registry = RoomRegistry::new(RoomRegistryConfig {
            room_config: RoomConfig::default(),
            ..RoomRegistryConfig::default()
        });
        let gm = PersistentId::new_game_master();
        let handle = registry.create(None, gm, "Alice".into(), false, false).await;

        store.save_all(&registry).await.unwrap();
        let loaded = store.load().await;
        assert!(loaded.contains_key(handle.code()));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn critical_events_append_as_json_lines() {
        let dir = tmp_dir();
        let store = SnapshotStore::new(dir.join("rooms.json"), dir.join("events.jsonl"));
        store
            .append_critical_event(CriticalEvent::RoomCreated {
                code: RoomCode("ABC123".into()),
                at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .append_critical_event(CriticalEvent::RoomEvicted {
                code: RoomCode("ABC123".into()),
                at: Utc::now(),
            })
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(dir.join("events.jsonl")).await.unwrap();
        assert_eq!(contents.lines().count(), 2);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
