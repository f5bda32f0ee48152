//! Recap archive: durable copies of `GameRecap`s, addressable by an
//! archive id so the `/api/recaps` mirror keeps serving a game's recap
//! after its room has been evicted from the registry (spec §6.3).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use quizroom_protocol::{GameRecap, RoomCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::snapshot::append_json_line;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecap {
    pub id: Uuid,
    pub room_code: RoomCode,
    pub generated_at: DateTime<Utc>,
    pub recap: GameRecap,
}

/// In-memory index over the recap archive, backed by an append-only
/// JSON-lines file so the index can be rebuilt on restart.
pub struct RecapStore {
    path: PathBuf,
    entries: RwLock<Vec<StoredRecap>>,
}

impl RecapStore {
    /// Loads the archive file (if any) into memory. Corrupt lines are
    /// skipped rather than failing the whole load.
    pub async fn load(path: PathBuf) -> Self {
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .filter_map(|line| serde_json::from_str::<StoredRecap>(line).ok())
                .collect(),
            Err(_) => Vec::new(),
        };
        Self { path, entries: RwLock::new(entries) }
    }

    /// Archives a freshly generated recap, appending it to disk and the
    /// in-memory index.
    pub async fn archive(&self, room_code: RoomCode, recap: GameRecap) -> StoredRecap {
        let stored = StoredRecap {
            id: Uuid::new_v4(),
            room_code,
            generated_at: recap.generated_at,
            recap,
        };
        if let Err(err) = append_json_line(&self.path, &stored).await {
            tracing::warn!(error = %err, "failed to append recap to the archive log");
        }
        self.entries.write().unwrap().push(stored.clone());
        stored
    }

    pub fn all(&self) -> Vec<StoredRecap> {
        self.entries.read().unwrap().clone()
    }

    pub fn by_id(&self, id: Uuid) -> Option<StoredRecap> {
        self.entries.read().unwrap().iter().find(|e| e.id == id).cloned()
    }

    pub fn by_room_code(&self, code: &RoomCode) -> Vec<StoredRecap> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| &e.room_code == code)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recap(code: &str) -> GameRecap {
        GameRecap {
            room_code: RoomCode(code.into()),
            rounds: vec![],
            standings: vec![],
            initial_selected_round_index: 0,
            initial_selected_tab_key: GameRecap::DEFAULT_TAB_KEY.into(),
            generated_at: Utc::now(),
        }
    }

    fn tmp_path() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("quizroom-recap-test-{}.jsonl", Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn archive_then_lookup_by_id_and_room_code() {
        let store = RecapStore::load(tmp_path()).await;
        let stored = store.archive(RoomCode("ABC123".into()), sample_recap("ABC123")).await;

        assert!(store.by_id(stored.id).is_some());
        assert_eq!(store.by_room_code(&RoomCode("ABC123".into())).len(), 1);
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn reloading_from_disk_recovers_archived_entries() {
        let path = tmp_path();
        let store = RecapStore::load(path.clone()).await;
        store.archive(RoomCode("ABC123".into()), sample_recap("ABC123")).await;

        let reloaded = RecapStore::load(path.clone()).await;
        assert_eq!(reloaded.all().len(), 1);

        tokio::fs::remove_file(&path).await.ok();
    }
}
