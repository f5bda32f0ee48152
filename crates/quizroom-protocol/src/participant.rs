//! Participant records: game masters, players, and the fields the wire
//! snapshot exposes about each.

use crate::types::{Answer, Avatar, PersistentId};
use serde::{Deserialize, Serialize};

/// The participant's seat in the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    GameMaster,
    Player,
}

/// A participant bound into a room, addressed by [`PersistentId`].
///
/// `connection_id` is `None` while the participant is disconnected
/// (either mid-grace-period or, for the synthetic GM-as-player case,
/// never separately connected). Player-only fields (`lives`, `answers`,
/// `score`, ...) are `None` for a pure game master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub persistent_id: PersistentId,
    pub role: ParticipantRole,
    pub display_name: String,
    pub is_active: bool,
    pub is_spectator: bool,
    /// Sticky preference: whether this participant joined as a spectator,
    /// restored verbatim on room restart regardless of elimination state.
    pub joined_as_spectator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Avatar>,

    // Player-only fields. `None` for a plain (non-playing) game master.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives: Option<u32>,
    /// Per-round answer history, indexed by round number; sparse because
    /// a player may have missed rounds before joining or after elimination.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub answers: std::collections::BTreeMap<u32, Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_points_earned: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_answer_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl Participant {
    pub fn new_game_master(persistent_id: PersistentId, display_name: String) -> Self {
        Participant {
            persistent_id,
            role: ParticipantRole::GameMaster,
            display_name,
            is_active: true,
            is_spectator: true,
            joined_as_spectator: true,
            avatar: None,
            lives: None,
            answers: std::collections::BTreeMap::new(),
            score: None,
            streak: None,
            last_points_earned: None,
            last_answer_timestamp: None,
        }
    }

    pub fn new_player(
        persistent_id: PersistentId,
        display_name: String,
        is_spectator: bool,
        avatar: Option<Avatar>,
    ) -> Self {
        Participant {
            persistent_id,
            role: ParticipantRole::Player,
            display_name,
            is_active: true,
            is_spectator,
            joined_as_spectator: is_spectator,
            avatar,
            lives: Some(if is_spectator { 0 } else { 3 }),
            answers: std::collections::BTreeMap::new(),
            score: Some(0),
            streak: Some(0),
            last_points_earned: None,
            last_answer_timestamp: None,
        }
    }

    /// Upgrades this game master's own record in place into the synthetic
    /// "GameMaster (Playing)" seat when community voting turns on. There is
    /// exactly one `Participant` per `persistentId` (spec §3); the GM plays
    /// under their existing seat rather than a second, duplicate-keyed one.
    pub fn promote_to_playing_game_master(&mut self) {
        self.display_name = "GameMaster (Playing)".to_string();
        self.is_spectator = false;
        self.joined_as_spectator = false;
        self.lives = Some(3);
        self.score = Some(0);
        self.streak = Some(0);
        self.last_points_earned = None;
        self.last_answer_timestamp = None;
    }

    /// Reverts a playing GM seat back to a plain, non-playing game master
    /// when community voting turns off.
    pub fn demote_from_playing_game_master(&mut self, original_display_name: String) {
        self.display_name = original_display_name;
        self.is_spectator = true;
        self.joined_as_spectator = true;
        self.lives = None;
        self.answers = std::collections::BTreeMap::new();
        self.score = None;
        self.streak = None;
        self.last_points_earned = None;
        self.last_answer_timestamp = None;
    }

    pub fn is_eliminated(&self) -> bool {
        matches!(self.lives, Some(0))
    }
}
