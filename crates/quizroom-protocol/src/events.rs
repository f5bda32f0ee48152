//! The client↔server event vocabulary and the consolidated game-state
//! snapshot that rides along with most server events.
//!
//! Every event is tagged by an explicit `type` string matching its wire
//! name (snake_case for game events, kebab-case for the signaling
//! passthroughs) rather than a derived name, so the JSON shape is pinned
//! regardless of how the Rust variants get renamed later.

use crate::participant::Participant;
use crate::recap::GameRecap;
use crate::types::{Avatar, BoardSnapshot, PersistentId, Question, RoomCode, Vote};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Consolidated game state snapshot
// ---------------------------------------------------------------------------

/// The single consolidated snapshot sent on every `game_state_update`.
///
/// The dispatcher never ships partial diffs — every state change is
/// followed by one full `GameStateSnapshot` broadcast to the room. Every
/// optional field is explicitly nullable so new fields can be added later
/// without breaking older clients (they simply ignore what they don't
/// recognize and treat missing optionals as their documented default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    pub started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<Question>,
    pub current_question_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub players: Vec<Participant>,
    pub round_answers: BTreeMap<PersistentId, crate::types::Answer>,
    pub evaluated_answers: BTreeMap<PersistentId, bool>,
    pub submission_phase_over: bool,
    pub is_concluded: bool,
    pub player_boards: BTreeMap<PersistentId, BoardSnapshot>,
    pub is_community_voting_mode: bool,
    pub is_points_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_master_board_data: Option<String>,
    /// Current-round votes: answer author → voter → cast vote.
    pub current_votes: BTreeMap<PersistentId, BTreeMap<PersistentId, Vote>>,
}

// ---------------------------------------------------------------------------
// Client → server events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename = "create_room")]
    CreateRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<RoomCode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_streamer_mode: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_points_mode: Option<bool>,
    },
    #[serde(rename = "join_room")]
    JoinRoom {
        code: RoomCode,
        player_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_spectator: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<Avatar>,
    },
    #[serde(rename = "rejoin_room")]
    RejoinRoom {
        code: RoomCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_game_master: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        persistent_player_id: Option<PersistentId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<Avatar>,
    },
    #[serde(rename = "start_game")]
    StartGame {
        code: RoomCode,
        questions: Vec<Question>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_limit: Option<u32>,
    },
    #[serde(rename = "submit_answer")]
    SubmitAnswer {
        code: RoomCode,
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        has_drawing: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drawing_data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer_attempt_id: Option<String>,
    },
    #[serde(rename = "update_board")]
    UpdateBoard {
        code: RoomCode,
        board_data: String,
    },
    #[serde(rename = "evaluate_answer")]
    EvaluateAnswer {
        code: RoomCode,
        player_id: PersistentId,
        is_correct: bool,
    },
    #[serde(rename = "next_question")]
    NextQuestion { code: RoomCode },
    #[serde(rename = "end_round_early")]
    EndRoundEarly { code: RoomCode },
    #[serde(rename = "restart_game")]
    RestartGame { code: RoomCode },
    #[serde(rename = "start_preview_mode")]
    StartPreviewMode { code: RoomCode },
    #[serde(rename = "stop_preview_mode")]
    StopPreviewMode { code: RoomCode },
    #[serde(rename = "focus_submission")]
    FocusSubmission {
        code: RoomCode,
        player_id: PersistentId,
    },
    #[serde(rename = "kick_player")]
    KickPlayer {
        code: RoomCode,
        player_id_to_kick: PersistentId,
    },
    #[serde(rename = "toggle_community_voting")]
    ToggleCommunityVoting {
        code: RoomCode,
        is_community_voting_mode: bool,
    },
    #[serde(rename = "submit_vote")]
    SubmitVote {
        code: RoomCode,
        answer_id: PersistentId,
        vote: Vote,
    },
    #[serde(rename = "show_answer")]
    ShowAnswer {
        code: RoomCode,
        question_id: String,
    },
    #[serde(rename = "force_end_voting")]
    ForceEndVoting { code: RoomCode },
    #[serde(rename = "update_game_master_board")]
    UpdateGameMasterBoard {
        code: RoomCode,
        board_data: String,
    },
    #[serde(rename = "clear_game_master_board")]
    ClearGameMasterBoard { code: RoomCode },
    #[serde(rename = "update_avatar")]
    UpdateAvatar {
        code: RoomCode,
        persistent_player_id: PersistentId,
        avatar: Avatar,
    },
    #[serde(rename = "get_game_state")]
    GetGameState { code: RoomCode },
    #[serde(rename = "gm_end_game_request")]
    GmEndGameRequest { code: RoomCode },
    #[serde(rename = "gm_show_recap_to_all")]
    GmShowRecapToAll { code: RoomCode },
    #[serde(rename = "gm_navigate_recap_round")]
    GmNavigateRecapRound {
        code: RoomCode,
        round_index: u32,
    },
    #[serde(rename = "gm_navigate_recap_tab")]
    GmNavigateRecapTab { code: RoomCode, tab_key: String },

    // -- Signaling passthroughs (opaque to the room engine) --
    #[serde(rename = "webrtc-ready")]
    WebrtcReady { code: RoomCode },
    #[serde(rename = "webrtc-offer")]
    WebrtcOffer {
        code: RoomCode,
        to: PersistentId,
        sdp: serde_json::Value,
    },
    #[serde(rename = "webrtc-answer")]
    WebrtcAnswer {
        code: RoomCode,
        to: PersistentId,
        sdp: serde_json::Value,
    },
    #[serde(rename = "webrtc-ice-candidate")]
    WebrtcIceCandidate {
        code: RoomCode,
        to: PersistentId,
        candidate: serde_json::Value,
    },
    #[serde(rename = "webcam-state-change")]
    WebcamStateChange { code: RoomCode, enabled: bool },
    #[serde(rename = "microphone-state-change")]
    MicrophoneStateChange { code: RoomCode, enabled: bool },
}

// ---------------------------------------------------------------------------
// Server → client events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename = "persistent_id_assigned")]
    PersistentIdAssigned {
        persistent_id: PersistentId,
        /// Bearer token scoped to `(room_code, persistent_id)`, used to
        /// authorize the HTTP mirror endpoints in place of a spoofable
        /// connection-id header.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        http_token: Option<String>,
    },
    #[serde(rename = "room_created")]
    RoomCreated { code: RoomCode },
    #[serde(rename = "room_joined")]
    RoomJoined {
        code: RoomCode,
        state: GameStateSnapshot,
    },
    #[serde(rename = "room_not_found")]
    RoomNotFound { code: RoomCode },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "game_state_update")]
    GameStateUpdate { code: RoomCode, state: GameStateSnapshot },
    #[serde(rename = "game_started")]
    GameStarted { code: RoomCode, state: GameStateSnapshot },
    #[serde(rename = "new_question")]
    NewQuestion {
        code: RoomCode,
        question: Question,
        question_index: u32,
    },
    #[serde(rename = "timer_update")]
    TimerUpdate {
        code: RoomCode,
        time_remaining: u32,
    },
    #[serde(rename = "time_up")]
    TimeUp { code: RoomCode },
    #[serde(rename = "answer_received")]
    AnswerReceived {
        code: RoomCode,
        persistent_id: PersistentId,
    },
    #[serde(rename = "board_update")]
    BoardUpdate {
        code: RoomCode,
        persistent_id: PersistentId,
        board: BoardSnapshot,
    },
    #[serde(rename = "player_joined")]
    PlayerJoined {
        code: RoomCode,
        player: Participant,
    },
    #[serde(rename = "player_left_gracefully")]
    PlayerLeftGracefully {
        code: RoomCode,
        persistent_id: PersistentId,
    },
    #[serde(rename = "player_removed_after_timeout")]
    PlayerRemovedAfterTimeout {
        code: RoomCode,
        persistent_id: PersistentId,
    },
    #[serde(rename = "player_disconnected_status")]
    PlayerDisconnectedStatus {
        code: RoomCode,
        persistent_id: PersistentId,
        is_active: bool,
        temporary: bool,
    },
    #[serde(rename = "player_reconnected_status")]
    PlayerReconnectedStatus {
        code: RoomCode,
        persistent_id: PersistentId,
        is_active: bool,
    },
    #[serde(rename = "gm_disconnected_status")]
    GmDisconnectedStatus { code: RoomCode, disconnected: bool },
    #[serde(rename = "become_spectator")]
    BecomeSpectator { code: RoomCode },
    #[serde(rename = "kicked_from_room")]
    KickedFromRoom { code: RoomCode },
    #[serde(rename = "game_restarted")]
    GameRestarted { code: RoomCode, state: GameStateSnapshot },
    #[serde(rename = "game_over_pending_recap")]
    GameOverPendingRecap { code: RoomCode },
    #[serde(rename = "game_recap")]
    GameRecapEvent { code: RoomCode, recap: GameRecap },
    #[serde(rename = "recap_round_changed")]
    RecapRoundChanged { code: RoomCode, round_index: u32 },
    #[serde(rename = "recap_tab_changed")]
    RecapTabChanged { code: RoomCode, tab_key: String },
    #[serde(rename = "start_preview_mode")]
    StartPreviewMode { code: RoomCode, state: GameStateSnapshot },
    #[serde(rename = "stop_preview_mode")]
    StopPreviewMode { code: RoomCode },
    #[serde(rename = "focus_submission")]
    FocusSubmission {
        code: RoomCode,
        player_id: PersistentId,
    },
    #[serde(rename = "community_voting_status_changed")]
    CommunityVotingStatusChanged {
        code: RoomCode,
        is_community_voting_mode: bool,
    },
    #[serde(rename = "answer_voted")]
    AnswerVoted {
        code: RoomCode,
        answer_author_id: PersistentId,
        voter_id: PersistentId,
        vote: Vote,
    },
    #[serde(rename = "correct_answer_revealed")]
    CorrectAnswerRevealed {
        code: RoomCode,
        question_id: String,
        answer_text: Option<String>,
    },
    #[serde(rename = "gm_community_answer_accepted")]
    GmCommunityAnswerAccepted {
        code: RoomCode,
        persistent_id: PersistentId,
    },
    #[serde(rename = "avatar_updated")]
    AvatarUpdated {
        code: RoomCode,
        persistent_id: PersistentId,
        avatar: Avatar,
    },

    // -- Signaling passthroughs --
    #[serde(rename = "webrtc-ready")]
    WebrtcReady {
        code: RoomCode,
        ready_peers: Vec<PersistentId>,
    },
    #[serde(rename = "webrtc-offer")]
    WebrtcOffer {
        code: RoomCode,
        from: PersistentId,
        sdp: serde_json::Value,
    },
    #[serde(rename = "webrtc-answer")]
    WebrtcAnswer {
        code: RoomCode,
        from: PersistentId,
        sdp: serde_json::Value,
    },
    #[serde(rename = "webrtc-ice-candidate")]
    WebrtcIceCandidate {
        code: RoomCode,
        from: PersistentId,
        candidate: serde_json::Value,
    },
    #[serde(rename = "webcam-state-change")]
    WebcamStateChange {
        code: RoomCode,
        persistent_id: PersistentId,
        enabled: bool,
    },
    #[serde(rename = "microphone-state-change")]
    MicrophoneStateChange {
        code: RoomCode,
        persistent_id: PersistentId,
        enabled: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_event_create_room_tag_matches_wire_name() {
        let event = ClientEvent::CreateRoom {
            code: None,
            is_streamer_mode: Some(true),
            is_points_mode: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "create_room");
        assert_eq!(json["isStreamerMode"], true);
        assert!(json.get("code").is_none() || json["code"].is_null());
    }

    #[test]
    fn client_event_submit_answer_round_trips() {
        let event = ClientEvent::SubmitAnswer {
            code: RoomCode("ABC123".into()),
            answer: "42".into(),
            has_drawing: Some(false),
            drawing_data: None,
            answer_attempt_id: Some("try-1".into()),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ClientEvent = serde_json::from_slice(&bytes).unwrap();
        match decoded {
            ClientEvent::SubmitAnswer { code, answer, .. } => {
                assert_eq!(code, RoomCode("ABC123".into()));
                assert_eq!(answer, "42");
            }
            other => panic!("wrong variant decoded: {other:?}"),
        }
    }

    #[test]
    fn client_event_signaling_tags_use_kebab_case() {
        let event = ClientEvent::WebrtcReady {
            code: RoomCode("ABC123".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "webrtc-ready");
    }

    #[test]
    fn server_event_error_json_format() {
        let event = ServerEvent::Error {
            message: "Player name required".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Player name required");
    }

    #[test]
    fn game_state_snapshot_round_trips_with_empty_maps() {
        let snapshot = GameStateSnapshot {
            started: true,
            current_question: None,
            current_question_index: 0,
            time_limit: Some(30),
            question_start_time: None,
            players: vec![],
            round_answers: Default::default(),
            evaluated_answers: Default::default(),
            submission_phase_over: false,
            is_concluded: false,
            player_boards: Default::default(),
            is_community_voting_mode: false,
            is_points_mode: false,
            game_master_board_data: None,
            current_votes: Default::default(),
        };
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let decoded: GameStateSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn decode_unknown_event_type_returns_error() {
        let unknown = r#"{"type": "teleport_player", "code": "ABC123"}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
