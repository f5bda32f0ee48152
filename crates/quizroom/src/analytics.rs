//! Analytics sink: an append-only record of gameplay activity, mirrored
//! read-only over HTTP (spec §2.8, §6.4). Never read back into the room
//! engine — a write here can never change what a client sees next.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use quizroom_protocol::{PersistentId, RoomCode};
use serde::{Deserialize, Serialize};

use crate::snapshot::append_json_line;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalyticsRecord {
    AnswerSubmitted {
        room_code: RoomCode,
        persistent_id: PersistentId,
        at: DateTime<Utc>,
    },
    AnswerEvaluated {
        room_code: RoomCode,
        target: PersistentId,
        is_correct: bool,
        at: DateTime<Utc>,
    },
    RoundAdvanced {
        room_code: RoomCode,
        round_index: u32,
        at: DateTime<Utc>,
    },
    GameConcluded {
        room_code: RoomCode,
        at: DateTime<Utc>,
    },
}

impl AnalyticsRecord {
    fn room_code(&self) -> &RoomCode {
        match self {
            Self::AnswerSubmitted { room_code, .. }
            | Self::AnswerEvaluated { room_code, .. }
            | Self::RoundAdvanced { room_code, .. }
            | Self::GameConcluded { room_code, .. } => room_code,
        }
    }
}

pub struct AnalyticsSink {
    path: PathBuf,
}

impl AnalyticsSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn record(&self, record: AnalyticsRecord) {
        if let Err(err) = append_json_line(&self.path, &record).await {
            tracing::warn!(error = %err, "failed to append analytics record");
        }
    }

    /// Read-only mirror for `GET /api/analytics/game/:code` — scans the
    /// whole log and filters by room. Fine for the expected log sizes of
    /// a single-process realtime quiz server; not an index.
    pub async fn read_for_room(&self, code: &RoomCode) -> Vec<AnalyticsRecord> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };
        contents
            .lines()
            .filter_map(|line| serde_json::from_str::<AnalyticsRecord>(line).ok())
            .filter(|record| record.room_code() == code)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("quizroom-analytics-test-{}.jsonl", uuid::Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn records_filter_by_room_code() {
        let path = tmp_path();
        let sink = AnalyticsSink::new(path.clone());
        let code_a = RoomCode("AAAAAA".into());
        let code_b = RoomCode("BBBBBB".into());

        sink.record(AnalyticsRecord::AnswerSubmitted {
            room_code: code_a.clone(),
            persistent_id: PersistentId::new_player(),
            at: Utc::now(),
        })
        .await;
        sink.record(AnalyticsRecord::AnswerSubmitted {
            room_code: code_b.clone(),
            persistent_id: PersistentId::new_player(),
            at: Utc::now(),
        })
        .await;

        let records = sink.read_for_room(&code_a).await;
        assert_eq!(records.len(), 1);

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn read_for_room_on_missing_file_returns_empty() {
        let sink = AnalyticsSink::new(tmp_path());
        assert!(sink.read_for_room(&RoomCode("ABC123".into())).await.is_empty());
    }
}
