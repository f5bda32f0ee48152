//! Room configuration and the round state machine (spec §4.3.1).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room actor.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Command channel backpressure bound.
    pub channel_size: usize,
    /// Fixed grace window between a round's end trigger (timeout or
    /// `endRoundEarly`) and the actual auto-submit finalize.
    pub auto_submit_grace: std::time::Duration,
    /// How often the room actor sweeps its `SessionManager` for
    /// disconnect deadlines that have elapsed.
    pub session_sweep_interval: std::time::Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            auto_submit_grace: quizroom_tick::AUTO_SUBMIT_GRACE,
            session_sweep_interval: std::time::Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState — the round lifecycle (spec §4.3.1)
// ---------------------------------------------------------------------------

/// The round lifecycle state machine:
///
/// ```text
/// Idle → AwaitingSubmissions → Preview → {DirectEvaluation|CommunityVoting}
///      → Resolved → AwaitingSubmissions (next round) | Concluded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    /// No game started yet.
    Idle,
    /// Round is open for submissions.
    AwaitingSubmissions,
    /// Submission phase over; post-submission, pre-evaluation display.
    Preview,
    /// Preview resolved via GM direct judging (non-community mode).
    DirectEvaluation,
    /// Preview resolved via community vote.
    CommunityVoting,
    /// Round evaluation complete; about to advance or conclude.
    Resolved,
    /// Game over; recap available.
    Concluded,
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl RoomState {
    pub fn is_submission_phase(&self) -> bool {
        matches!(self, Self::AwaitingSubmissions)
    }

    pub fn is_concluded(&self) -> bool {
        matches!(self, Self::Concluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_room_config_has_one_second_grace() {
        let config = RoomConfig::default();
        assert_eq!(config.auto_submit_grace, std::time::Duration::from_secs(1));
    }

    #[test]
    fn room_state_display_matches_debug() {
        assert_eq!(RoomState::AwaitingSubmissions.to_string(), "AwaitingSubmissions");
    }
}
