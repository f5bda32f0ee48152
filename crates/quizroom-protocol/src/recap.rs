//! Recap types: the end-of-game summary broadcast to all participants and
//! served read-only over the HTTP recap endpoints.

use crate::types::PersistentId;
use serde::{Deserialize, Serialize};

/// One player's submission within a recapped round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapSubmission {
    pub persistent_id: PersistentId,
    pub display_name: String,
    pub text: String,
    pub has_drawing: bool,
    /// The drawing blob, falling back to the player's [`crate::types::BoardSnapshot`]
    /// for that round when the stored answer lacked an inline blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing: Option<String>,
    pub evaluation: crate::types::Evaluation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

/// One round's worth of recap data. Only rounds with at least one answer
/// are included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapRound {
    pub round_index: u32,
    pub question_id: String,
    pub question_text: String,
    pub submissions: Vec<RecapSubmission>,
}

/// A player's final standing, as listed in the recap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapStanding {
    pub persistent_id: PersistentId,
    pub display_name: String,
    pub lives: u32,
    pub is_active: bool,
    pub score: i64,
    pub is_winner: bool,
}

/// The full end-of-game recap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecap {
    pub room_code: crate::types::RoomCode,
    pub rounds: Vec<RecapRound>,
    /// Standings, sorted active-non-spectator first, then by lives desc,
    /// then by stable `persistentId`.
    pub standings: Vec<RecapStanding>,
    pub initial_selected_round_index: u32,
    pub initial_selected_tab_key: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl GameRecap {
    pub const DEFAULT_TAB_KEY: &'static str = "overallResults";
}
