//! Core wire types for the quiz room protocol.
//!
//! These are the structures that travel over the connection between a
//! browser client and the room server: identity newtypes, the question/
//! answer/board data model, and the consolidated game-state snapshot.
//! The event envelopes that carry them live in [`crate::events`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A room's 6-character uppercase alphanumeric join code.
///
/// Newtype wrapper around `String` so a `RoomCode` can never be confused
/// with a `PersistentId` at the type level, even though both serialize as
/// plain strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomCode {
    fn from(value: String) -> Self {
        RoomCode(value)
    }
}

impl RoomCode {
    /// Characters used when minting a fresh code — uppercase letters and
    /// digits only, matching the 6-character alphanumeric format.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    pub const LENGTH: usize = 6;
}

/// A stable participant identity, carried across reconnects.
///
/// The prefix denotes provenance: `GM-*` for a game master, `P-*` for a
/// named player, `F-*` for a transient fallback identity handed to a
/// connection before it has picked a name (e.g. still on the join screen).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistentId(pub String);

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PersistentId {
    fn from(value: String) -> Self {
        PersistentId(value)
    }
}

impl PersistentId {
    /// Mints a fresh game-master identity. GM identity is per-session: a
    /// new connection always gets a new one, never reused across sessions.
    pub fn new_game_master() -> Self {
        PersistentId(format!("GM-{}", uuid::Uuid::new_v4()))
    }

    /// Mints a fresh named-player identity.
    pub fn new_player() -> Self {
        PersistentId(format!("P-{}", uuid::Uuid::new_v4()))
    }

    /// Mints a fresh transient identity for a connection that has not yet
    /// named itself (e.g. bootstrapping the join screen).
    pub fn new_fallback() -> Self {
        PersistentId(format!("F-{}", uuid::Uuid::new_v4()))
    }

    pub fn is_game_master(&self) -> bool {
        self.0.starts_with("GM-")
    }

    pub fn is_fallback(&self) -> bool {
        self.0.starts_with("F-")
    }
}

/// A transient per-connection identifier, reset on every new socket.
///
/// Distinct from [`PersistentId`]: a participant keeps the same
/// `PersistentId` across a reconnect, but gets a brand new `ConnectionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Question / Answer / BoardSnapshot
// ---------------------------------------------------------------------------

/// The kind of expected answer for a [`Question`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Drawing,
}

/// An opaque question record, supplied by the game master at `start_game`.
///
/// The server never generates or validates question content; it only
/// stores and echoes these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Grade/difficulty weight, used for points-mode scoring.
    #[serde(default)]
    pub grade: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Evaluation state of a submitted [`Answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    Unevaluated,
    Correct,
    Incorrect,
}

/// One player's submission for the current round.
///
/// Immutable once stored except for `evaluation` and `points_awarded`,
/// which the engine fills in once the round resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub round_index: u32,
    pub persistent_id: PersistentId,
    pub display_name: String,
    pub text: String,
    #[serde(default)]
    pub has_drawing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_blob: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    /// Used for idempotent retry: resubmitting with the same attempt id
    /// for the same round and author is a no-op that still acknowledges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
    #[serde(default)]
    pub evaluation: Evaluation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<i64>,
    /// Zero-based order in which this round's submissions arrived; used by
    /// points-mode position bonus. Assigned atomically on receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_order: Option<u32>,
}

impl Default for Evaluation {
    fn default() -> Self {
        Evaluation::Unevaluated
    }
}

/// A player's live drawing buffer for the current round.
///
/// Superseded wholesale on each `update_board`; only persisted across
/// rounds by being copied into an [`Answer`]'s `drawing_blob` at submit
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub blob: String,
    pub round_index: u32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A single recorded community vote on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Correct,
    Incorrect,
}

// ---------------------------------------------------------------------------
// Avatars
// ---------------------------------------------------------------------------

/// An opaque avatar payload (small image data URI or similar blob). The
/// server never interprets its contents, only stores and broadcasts it.
pub type Avatar = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode("ABC123".into())).unwrap();
        assert_eq!(json, "\"ABC123\"");
    }

    #[test]
    fn persistent_id_display_is_transparent() {
        let pid = PersistentId("P-abc".into());
        assert_eq!(pid.to_string(), "P-abc");
    }

    #[test]
    fn game_master_id_carries_gm_prefix() {
        let pid = PersistentId::new_game_master();
        assert!(pid.is_game_master());
        assert!(pid.0.starts_with("GM-"));
    }

    #[test]
    fn player_id_carries_p_prefix() {
        let pid = PersistentId::new_player();
        assert!(pid.0.starts_with("P-"));
        assert!(!pid.is_game_master());
    }

    #[test]
    fn fallback_id_carries_f_prefix() {
        let pid = PersistentId::new_fallback();
        assert!(pid.is_fallback());
    }

    #[test]
    fn connection_id_display_has_c_prefix() {
        assert_eq!(ConnectionId(7).to_string(), "C-7");
    }

    #[test]
    fn evaluation_defaults_to_unevaluated() {
        assert_eq!(Evaluation::default(), Evaluation::Unevaluated);
    }

    #[test]
    fn answer_round_trips_through_json() {
        let answer = Answer {
            round_index: 0,
            persistent_id: PersistentId("P-1".into()),
            display_name: "alice".into(),
            text: "4".into(),
            has_drawing: false,
            drawing_blob: None,
            submitted_at: chrono::Utc::now(),
            attempt_id: Some("attempt-1".into()),
            evaluation: Evaluation::Unevaluated,
            points_awarded: None,
            submission_order: Some(0),
        };
        let bytes = serde_json::to_vec(&answer).unwrap();
        let decoded: Answer = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(answer, decoded);
    }

    #[test]
    fn question_type_tag_is_a_camel_case_literal() {
        let json = serde_json::to_value(QuestionType::Drawing).unwrap();
        assert_eq!(json, serde_json::json!("drawing"));
    }
}
