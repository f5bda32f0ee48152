//! The ephemeral-field-free projection of a room, persisted by the
//! snapshot store (spec §4.5, §6.4).
//!
//! Timers, connection ids, live board snapshots, and active votes are all
//! excluded — [`Engine::to_persisted`](crate::Engine::to_persisted) is the
//! only place that constructs one of these, and
//! [`Engine::from_persisted`](crate::Engine::from_persisted) the only
//! place that consumes one.

use chrono::{DateTime, Utc};
use quizroom_protocol::{Participant, PersistentId, Question, RoomCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPersistedState {
    pub code: RoomCode,
    pub gm_persistent_id: PersistentId,
    pub gm_display_name: String,
    pub participants: Vec<Participant>,
    pub questions: Vec<Question>,
    pub current_round_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_started_at: Option<DateTime<Utc>>,
    pub is_streamer_mode: bool,
    pub is_community_voting_mode: bool,
    pub is_points_mode: bool,
    pub started: bool,
    pub is_concluded: bool,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizroom_protocol::QuestionType;

    #[test]
    fn round_trips_through_json() {
        let state = RoomPersistedState {
            code: RoomCode("ABC123".into()),
            gm_persistent_id: PersistentId("GM-1".into()),
            gm_display_name: "Alice".into(),
            participants: vec![],
            questions: vec![Question {
                id: "q1".into(),
                text: "2+2?".into(),
                question_type: QuestionType::Text,
                answer: Some("4".into()),
                grade: 2,
                subject: None,
                language: None,
            }],
            current_round_index: 0,
            time_limit_seconds: Some(30),
            round_started_at: None,
            is_streamer_mode: false,
            is_community_voting_mode: false,
            is_points_mode: false,
            started: true,
            is_concluded: false,
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&state).unwrap();
        let decoded: RoomPersistedState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.code, state.code);
        assert_eq!(decoded.questions.len(), 1);
    }
}
