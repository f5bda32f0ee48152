//! The quiz room state machine: round lifecycle, submissions, evaluation,
//! lives/elimination, game conclusion, and recap generation (spec §4.3).
//!
//! [`Engine`] is a plain synchronous struct — no I/O, no channels, no
//! clock. Every operation takes the caller's resolved [`PersistentId`]
//! (already authorized by the actor against the caller's role) and
//! returns an [`Effect`] describing what to broadcast and whether the
//! round timer needs to be (re)armed. The actor in [`crate::room`] is the
//! only thing that touches wall-clock time or sockets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quizroom_protocol::{
    Answer, Avatar, BoardSnapshot, Evaluation, GameRecap, GameStateSnapshot, Participant,
    ParticipantRole, PersistentId, Question, QuestionType, RecapRound, RecapStanding,
    RecapSubmission, RoomCode, ServerEvent, Vote,
};

use crate::{RoomError, RoomState};

/// Position bonus by zero-based submission order (spec §4.3.4).
const POSITION_BONUS: [i64; 5] = [300, 200, 100, 50, 25];
/// Streak multiplier by current streak, saturating at the last entry.
const STREAK_MULTIPLIER: [f64; 6] = [1.0, 1.2, 1.5, 2.0, 2.5, 3.0];
/// Initial lives for a non-spectator player.
const INITIAL_LIVES: u32 = 3;

// ---------------------------------------------------------------------------
// Outbox / Effect
// ---------------------------------------------------------------------------

/// A server event destined for the whole room or for one participant.
#[derive(Debug, Clone)]
pub enum Recipient {
    All,
    Only(PersistentId),
    AllExcept(PersistentId),
}

/// Events an [`Engine`] operation produced, not yet dispatched to sockets.
#[derive(Debug, Clone, Default)]
pub struct Outbox(pub Vec<(Recipient, ServerEvent)>);

impl Outbox {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn all(&mut self, event: ServerEvent) {
        self.0.push((Recipient::All, event));
    }

    fn only(&mut self, pid: PersistentId, event: ServerEvent) {
        self.0.push((Recipient::Only(pid), event));
    }

    fn all_except(&mut self, pid: PersistentId, event: ServerEvent) {
        self.0.push((Recipient::AllExcept(pid), event));
    }
}

/// What the actor should do with the per-room round timer after an
/// operation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerDirective {
    #[default]
    Unchanged,
    /// Cancel any running countdown and start a fresh one for this limit
    /// (`None`/`>=99999` arms no countdown at all).
    Start(Option<u32>),
    /// Cancel any running countdown, arm no replacement.
    Cancel,
    /// The submission phase just ended (timeout or `endRoundEarly`); wait
    /// the fixed auto-submit grace window, then call
    /// [`Engine::finalize_submission_phase`].
    ArmGrace,
}

/// The full result of a successful [`Engine`] operation.
#[derive(Debug, Clone, Default)]
pub struct Effect {
    pub outbox: Outbox,
    pub timer: TimerDirective,
    /// Set when the room should be evicted from the registry after this
    /// operation's broadcasts are flushed (GM-disconnect-expiry conclude).
    pub evict: bool,
}

impl Effect {
    fn new(outbox: Outbox) -> Self {
        Self {
            outbox,
            timer: TimerDirective::Unchanged,
            evict: false,
        }
    }

    fn with_timer(mut self, timer: TimerDirective) -> Self {
        self.timer = timer;
        self
    }

    fn evicting(mut self) -> Self {
        self.evict = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Round history (retained across the live per-round maps for recap)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct RoundRecord {
    round_index: u32,
    question_id: String,
    question_text: String,
    answers: BTreeMap<PersistentId, Answer>,
    boards: BTreeMap<PersistentId, BoardSnapshot>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The authoritative game state for one room (spec §3 `Room`).
pub struct Engine {
    pub code: RoomCode,
    pub gm_persistent_id: PersistentId,
    /// The GM's display name outside of the playing seat, restored onto
    /// the GM's participant record when community voting turns back off.
    gm_display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,

    pub started: bool,
    pub concluded: bool,
    pub is_streamer_mode: bool,
    pub is_community_voting_mode: bool,
    pub is_points_mode: bool,

    questions: Vec<Question>,
    current_round_index: u32,
    round_started_at: Option<DateTime<Utc>>,
    time_limit_seconds: Option<u32>,
    submission_phase_over: bool,

    round_answers: BTreeMap<PersistentId, Answer>,
    evaluated_answers: BTreeMap<PersistentId, bool>,
    player_boards: BTreeMap<PersistentId, BoardSnapshot>,
    gm_board_data: Option<String>,
    votes: BTreeMap<PersistentId, BTreeMap<PersistentId, Vote>>,

    participants: Vec<Participant>,
    history: Vec<RoundRecord>,
    next_submission_order: u32,

    /// Connections that have announced `webrtc-ready` (spec §4.6). Purely
    /// transient signaling bookkeeping, not part of the persisted snapshot.
    ready_peers: std::collections::BTreeSet<PersistentId>,

    state: RoomState,
}

impl Engine {
    /// `createRoom`: bind the GM and construct an empty, unstarted room.
    pub fn new(
        code: RoomCode,
        gm_persistent_id: PersistentId,
        gm_display_name: String,
        is_streamer_mode: bool,
        is_points_mode: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let gm = Participant::new_game_master(gm_persistent_id.clone(), gm_display_name.clone());
        Self {
            code,
            gm_persistent_id,
            gm_display_name,
            created_at: now,
            last_activity: now,
            started: false,
            concluded: false,
            is_streamer_mode,
            is_community_voting_mode: false,
            is_points_mode,
            questions: Vec::new(),
            current_round_index: 0,
            round_started_at: None,
            time_limit_seconds: None,
            submission_phase_over: false,
            round_answers: BTreeMap::new(),
            evaluated_answers: BTreeMap::new(),
            player_boards: BTreeMap::new(),
            gm_board_data: None,
            votes: BTreeMap::new(),
            participants: vec![gm],
            history: Vec::new(),
            next_submission_order: 0,
            ready_peers: std::collections::BTreeSet::new(),
            state: RoomState::Idle,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn is_gm(&self, pid: &PersistentId) -> bool {
        *pid == self.gm_persistent_id
    }

    fn find(&self, pid: &PersistentId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.persistent_id == *pid)
    }

    fn find_mut(&mut self, pid: &PersistentId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.persistent_id == *pid)
    }

    pub fn has_participant(&self, pid: &PersistentId) -> bool {
        self.find(pid).is_some()
    }

    /// Active non-spectator players, including the synthetic
    /// `GameMaster (Playing)` seat (identified by `role == GameMaster` but
    /// carrying player fields) when community voting is on.
    fn active_players(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(|p| p.is_active && !p.is_spectator && (p.role == ParticipantRole::Player || p.score.is_some()))
    }

    fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_round_index as usize)
    }

    pub fn current_round_index(&self) -> u32 {
        self.current_round_index
    }

    /// Mirrors `round_answers[pid]` into that participant's own sparse
    /// `answers[roundIndex]` history (spec §3's Player data model), so a
    /// reconnecting player's wire snapshot carries their past rounds, not
    /// just the live current-round map.
    fn sync_participant_answer(&mut self, pid: &PersistentId) {
        let round_index = self.current_round_index;
        let Some(answer) = self.round_answers.get(pid).cloned() else {
            return;
        };
        if let Some(p) = self.find_mut(pid) {
            p.answers.insert(round_index, answer);
        }
    }

    /// The GM's own participant record, when it's currently upgraded into
    /// the playing seat (`score.is_some()`). There's exactly one record for
    /// `gm_persistent_id`, so this is never shadowed by a second entry.
    fn gm_as_player(&self) -> Option<&Participant> {
        self.find(&self.gm_persistent_id).filter(|p| p.score.is_some())
    }

    /// The set of participants expected to submit this round: active
    /// non-spectator players, plus the GM if community voting is on.
    fn expected_submitters(&self) -> Vec<PersistentId> {
        self.active_players().map(|p| p.persistent_id.clone()).collect()
    }

    // -----------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------

    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            started: self.started,
            current_question: self.current_question().cloned(),
            current_question_index: self.current_round_index,
            time_limit: self.time_limit_seconds,
            question_start_time: self.round_started_at,
            players: self.participants.clone(),
            round_answers: self.round_answers.clone(),
            evaluated_answers: self.evaluated_answers.clone(),
            submission_phase_over: self.submission_phase_over,
            is_concluded: self.concluded,
            player_boards: self.player_boards.clone(),
            is_community_voting_mode: self.is_community_voting_mode,
            is_points_mode: self.is_points_mode,
            game_master_board_data: self.gm_board_data.clone(),
            current_votes: self.votes.clone(),
        }
    }

    fn state_update(&self) -> ServerEvent {
        ServerEvent::GameStateUpdate {
            code: self.code.clone(),
            state: self.snapshot(),
        }
    }

    fn finish(&self, mut outbox: Outbox) -> Outbox {
        outbox.all(self.state_update());
        outbox
    }

    // -----------------------------------------------------------------
    // Persistence (spec §4.5, §6.4) — the ephemeral-field-free projection
    // the snapshot store serializes every 30s and on critical events.
    // -----------------------------------------------------------------

    /// Projects the room onto the fields the snapshot store persists:
    /// timers, connection ids, live board snapshots, and active votes are
    /// all excluded per spec §4.5.
    pub fn to_persisted(&self, saved_at: DateTime<Utc>) -> crate::persist::RoomPersistedState {
        crate::persist::RoomPersistedState {
            code: self.code.clone(),
            gm_persistent_id: self.gm_persistent_id.clone(),
            gm_display_name: self.gm_display_name.clone(),
            participants: self.participants.clone(),
            questions: self.questions.clone(),
            current_round_index: self.current_round_index,
            time_limit_seconds: self.time_limit_seconds,
            round_started_at: self.round_started_at,
            is_streamer_mode: self.is_streamer_mode,
            is_community_voting_mode: self.is_community_voting_mode,
            is_points_mode: self.is_points_mode,
            started: self.started,
            is_concluded: self.concluded,
            saved_at,
        }
    }

    /// Rebuilds a room from a loaded snapshot. Every participant comes
    /// back `isActive=false` (they must reconnect) and no timer is armed;
    /// the caller (room actor spawn) never constructs a `RoundTimer` for
    /// a restored room, matching spec §4.5's restart contract.
    pub fn from_persisted(state: crate::persist::RoomPersistedState) -> Self {
        let participants = state
            .participants
            .into_iter()
            .map(|mut p| {
                p.is_active = false;
                p
            })
            .collect();
        let room_state = if state.is_concluded {
            RoomState::Concluded
        } else if state.started {
            RoomState::AwaitingSubmissions
        } else {
            RoomState::Idle
        };
        Self {
            code: state.code,
            gm_persistent_id: state.gm_persistent_id,
            gm_display_name: state.gm_display_name,
            created_at: state.saved_at,
            last_activity: state.saved_at,
            started: state.started,
            concluded: state.is_concluded,
            is_streamer_mode: state.is_streamer_mode,
            is_community_voting_mode: state.is_community_voting_mode,
            is_points_mode: state.is_points_mode,
            questions: state.questions,
            current_round_index: state.current_round_index,
            round_started_at: state.round_started_at,
            time_limit_seconds: state.time_limit_seconds,
            submission_phase_over: false,
            round_answers: BTreeMap::new(),
            evaluated_answers: BTreeMap::new(),
            player_boards: BTreeMap::new(),
            gm_board_data: None,
            votes: BTreeMap::new(),
            participants,
            history: Vec::new(),
            next_submission_order: 0,
            ready_peers: std::collections::BTreeSet::new(),
            state: room_state,
        }
    }

    /// Read-only accessors for the HTTP recap/debug surfaces (spec §6.3).
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn recap(&self, now: DateTime<Utc>) -> GameRecap {
        self.generate_recap(now)
    }

    // -----------------------------------------------------------------
    // joinRoom / rejoinRoom
    // -----------------------------------------------------------------

    /// `joinRoom`. `already_live` is the session layer's verdict on
    /// whether an existing connection for this `pid` is still alive
    /// (spec S6); the engine itself only knows about seats, not sockets.
    pub fn join_player(
        &mut self,
        pid: &PersistentId,
        display_name: &str,
        is_spectator: bool,
        avatar: Option<Avatar>,
        already_live: bool,
    ) -> Result<Effect, RoomError> {
        if already_live {
            return Err(RoomError::AlreadyConnected(pid.clone()));
        }

        if let Some(existing) = self.find_mut(pid) {
            existing.is_active = true;
            if avatar.is_some() {
                existing.avatar = avatar.clone();
            }
            let mut outbox = Outbox::new();
            outbox.all(ServerEvent::PlayerReconnectedStatus {
                code: self.code.clone(),
                persistent_id: pid.clone(),
                is_active: true,
            });
            return Ok(Effect::new(self.finish(outbox)));
        }

        let name_taken = self
            .participants
            .iter()
            .any(|p| p.display_name.eq_ignore_ascii_case(display_name));
        if name_taken {
            return Err(RoomError::NameTaken(display_name.to_string()));
        }

        let participant =
            Participant::new_player(pid.clone(), display_name.to_string(), is_spectator, avatar);
        self.participants.push(participant.clone());

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::PlayerJoined {
            code: self.code.clone(),
            player: participant,
        });
        Ok(Effect::new(self.finish(outbox)))
    }

    // -----------------------------------------------------------------
    // createRoom reclaim-by-code (spec §4.2)
    // -----------------------------------------------------------------

    /// Rebinds an existing room's GM seat to a new `persistentId`.
    ///
    /// `createRoom` mints a fresh `GM-*` identity every session (spec
    /// §4.1), so a GM whose socket dropped and who creates a room again
    /// with the same explicit code can never reclaim by identity match —
    /// only by code. This swaps the bound GM id and display name in
    /// place; the caller still has to `joinRoom`/bind a sender afterward,
    /// which then takes the ordinary GM-reconnect path since `is_gm`
    /// now matches.
    pub fn reclaim_gm(&mut self, new_gm: PersistentId, display_name: String) {
        let old_gm = std::mem::replace(&mut self.gm_persistent_id, new_gm.clone());
        self.gm_display_name = display_name.clone();
        for p in self.participants.iter_mut() {
            if p.role == ParticipantRole::GameMaster && p.persistent_id == old_gm {
                p.persistent_id = new_gm.clone();
                if p.score.is_none() {
                    p.display_name = display_name.clone();
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // startGame
    // -----------------------------------------------------------------

    pub fn start_game(
        &mut self,
        caller: &PersistentId,
        questions: Vec<Question>,
        time_limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }

        self.questions = questions;
        self.current_round_index = 0;
        self.time_limit_seconds = time_limit;
        self.started = true;
        self.concluded = false;
        self.state = RoomState::AwaitingSubmissions;
        self.begin_round(now);

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::GameStarted {
            code: self.code.clone(),
            state: self.snapshot(),
        });
        Ok(Effect::new(self.finish(outbox)).with_timer(TimerDirective::Start(time_limit)))
    }

    fn begin_round(&mut self, now: DateTime<Utc>) {
        self.round_started_at = Some(now);
        self.submission_phase_over = false;
        self.round_answers.clear();
        self.evaluated_answers.clear();
        self.votes.clear();
        self.gm_board_data = None;
        self.player_boards.clear();
        self.next_submission_order = 0;
        self.state = RoomState::AwaitingSubmissions;
    }

    // -----------------------------------------------------------------
    // submitAnswer
    // -----------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn submit_answer(
        &mut self,
        caller: &PersistentId,
        text: String,
        has_drawing: bool,
        drawing_blob: Option<String>,
        attempt_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        if !self.started {
            return Err(RoomError::NotStarted);
        }
        if self.submission_phase_over {
            return Err(RoomError::SubmissionPhaseOver);
        }
        // A plain GM may never submit; the synthetic "GameMaster (Playing)"
        // seat (role stays GameMaster, but carries player fields) may, since
        // community voting mode lets the GM play alongside everyone else.
        let can_submit = self
            .find(caller)
            .map(|p| {
                p.is_active && !p.is_spectator && (p.role == ParticipantRole::Player || p.score.is_some())
            })
            .unwrap_or(false);
        if !can_submit {
            return Err(RoomError::IsSpectator);
        }

        if let Some(existing) = self.round_answers.get(caller) {
            if existing.attempt_id.is_some() && existing.attempt_id == attempt_id {
                // Idempotent retry: already stored, ack without mutating.
                return Ok(Effect::new(Outbox::new()));
            }
            return Err(RoomError::DuplicateSubmission);
        }

        let drawing_blob = drawing_blob.or_else(|| {
            self.player_boards
                .get(caller)
                .filter(|b| b.round_index == self.current_round_index)
                .map(|b| b.blob.clone())
        });
        let display_name = self
            .find(caller)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();

        let order = self.next_submission_order;
        self.next_submission_order += 1;

        let answer = Answer {
            round_index: self.current_round_index,
            persistent_id: caller.clone(),
            display_name,
            text,
            has_drawing,
            drawing_blob,
            submitted_at: now,
            attempt_id,
            evaluation: Evaluation::Unevaluated,
            points_awarded: None,
            submission_order: Some(order),
        };
        self.round_answers.insert(caller.clone(), answer);
        self.sync_participant_answer(caller);

        if let Some(p) = self.find_mut(caller) {
            p.last_answer_timestamp = Some(now);
        }

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::AnswerReceived {
            code: self.code.clone(),
            persistent_id: caller.clone(),
        });

        if self.all_expected_submitted() {
            let finalize = self.finalize_submission_phase_inner(now);
            outbox.0.extend(finalize.0);
            return Ok(Effect::new(self.finish(outbox)));
        }

        Ok(Effect::new(self.finish(outbox)))
    }

    fn all_expected_submitted(&self) -> bool {
        let expected = self.expected_submitters();
        !expected.is_empty() && expected.iter().all(|pid| self.round_answers.contains_key(pid))
    }

    // -----------------------------------------------------------------
    // updateBoard
    // -----------------------------------------------------------------

    pub fn update_board(
        &mut self,
        caller: &PersistentId,
        blob: String,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        let ok = self
            .find(caller)
            .map(|p| p.is_active && !p.is_spectator)
            .unwrap_or(false);
        if !ok {
            return Err(RoomError::IsSpectator);
        }
        if self.submission_phase_over {
            return Err(RoomError::SubmissionPhaseOver);
        }

        let board = BoardSnapshot {
            blob,
            round_index: self.current_round_index,
            updated_at: now,
        };
        self.player_boards.insert(caller.clone(), board.clone());

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::BoardUpdate {
            code: self.code.clone(),
            persistent_id: caller.clone(),
            board,
        });
        Ok(Effect::new(outbox))
    }

    // -----------------------------------------------------------------
    // endRoundEarly / timeout → grace → finalize
    // -----------------------------------------------------------------

    pub fn end_round_early(&mut self, caller: &PersistentId) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        Ok(self.trigger_round_end())
    }

    /// Called by the actor when the round countdown expires.
    pub fn handle_timeout(&mut self) -> Effect {
        self.trigger_round_end()
    }

    fn trigger_round_end(&mut self) -> Effect {
        if self.submission_phase_over || self.state != RoomState::AwaitingSubmissions {
            return Effect::new(Outbox::new());
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::TimeUp {
            code: self.code.clone(),
        });
        Effect::new(outbox).with_timer(TimerDirective::ArmGrace)
    }

    /// Called after the fixed auto-submit grace window elapses (or
    /// immediately, synchronously, when every expected participant has
    /// already submitted). Auto-submits `"-"` for stragglers and moves
    /// the round into its evaluation phase.
    pub fn finalize_submission_phase(&mut self, now: DateTime<Utc>) -> Effect {
        let outbox = self.finalize_submission_phase_inner(now);
        Effect::new(self.finish(outbox))
    }

    fn finalize_submission_phase_inner(&mut self, now: DateTime<Utc>) -> Outbox {
        if self.submission_phase_over {
            return Outbox::new();
        }
        self.submission_phase_over = true;

        for pid in self.expected_submitters() {
            if self.round_answers.contains_key(&pid) {
                continue;
            }
            let has_drawing = self
                .player_boards
                .get(&pid)
                .map(|b| b.round_index == self.current_round_index)
                .unwrap_or(false);
            let drawing_blob = if has_drawing {
                self.player_boards.get(&pid).map(|b| b.blob.clone())
            } else {
                None
            };
            let display_name = self.find(&pid).map(|p| p.display_name.clone()).unwrap_or_default();
            let order = self.next_submission_order;
            self.next_submission_order += 1;
            self.round_answers.insert(
                pid.clone(),
                Answer {
                    round_index: self.current_round_index,
                    persistent_id: pid.clone(),
                    display_name,
                    text: "-".to_string(),
                    has_drawing,
                    drawing_blob,
                    submitted_at: now,
                    attempt_id: None,
                    evaluation: Evaluation::Unevaluated,
                    points_awarded: None,
                    submission_order: Some(order),
                },
            );
            self.sync_participant_answer(&pid);
        }

        self.state = if self.is_community_voting_mode {
            RoomState::CommunityVoting
        } else {
            RoomState::DirectEvaluation
        };

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::StartPreviewMode {
            code: self.code.clone(),
            state: self.snapshot(),
        });
        outbox
    }

    // -----------------------------------------------------------------
    // evaluateAnswer (direct mode)
    // -----------------------------------------------------------------

    pub fn evaluate_answer(
        &mut self,
        caller: &PersistentId,
        target: &PersistentId,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        if self.is_community_voting_mode {
            return Err(RoomError::CommunityVotingModeActive);
        }
        if !self.round_answers.contains_key(target) {
            return Err(RoomError::ParticipantNotFound(target.clone()));
        }

        self.apply_evaluation(target, is_correct, now);

        let mut outbox = Outbox::new();
        if self.evaluated_answers.len() >= self.round_answers.len() {
            outbox.0.extend(self.resolve_round(now).0);
        }
        Ok(Effect::new(self.finish(outbox)))
    }

    fn apply_evaluation(&mut self, target: &PersistentId, is_correct: bool, now: DateTime<Utc>) {
        self.evaluated_answers.insert(target.clone(), is_correct);
        if let Some(answer) = self.round_answers.get_mut(target) {
            answer.evaluation = if is_correct {
                Evaluation::Correct
            } else {
                Evaluation::Incorrect
            };
        }

        let points = if is_correct && self.is_points_mode {
            self.compute_points(target)
        } else {
            0
        };

        if let Some(p) = self.find_mut(target) {
            if is_correct {
                if self.is_points_mode {
                    p.score = Some(p.score.unwrap_or(0) + points);
                    p.streak = Some(p.streak.unwrap_or(0) + 1);
                    p.last_points_earned = Some(points);
                }
            } else {
                p.lives = Some(p.lives.unwrap_or(1).saturating_sub(1));
                p.streak = Some(0);
                p.last_points_earned = Some(0);
                if p.lives == Some(0) {
                    p.is_spectator = true;
                }
            }
        }
        if let Some(answer) = self.round_answers.get_mut(target) {
            answer.points_awarded = Some(points);
        }
        self.sync_participant_answer(target);
        let _ = now;
    }

    fn compute_points(&self, pid: &PersistentId) -> i64 {
        let Some(question) = self.current_question() else {
            return 0;
        };
        let Some(answer) = self.round_answers.get(pid) else {
            return 0;
        };
        let base = (question.grade as f64) * 100.0;

        let time_bonus = match (self.time_limit_seconds, self.round_started_at) {
            (Some(limit), Some(started)) if limit > 0 && limit < quizroom_tick::NO_TIMER_SENTINEL => {
                let total = limit as f64;
                let elapsed = (answer.submitted_at - started).num_milliseconds() as f64 / 1000.0;
                let remaining = (total - elapsed).clamp(0.0, total);
                base * 0.5 * (remaining / total).powf(1.5)
            }
            _ => 0.0,
        };

        let position_bonus = answer
            .submission_order
            .and_then(|order| POSITION_BONUS.get(order as usize).copied())
            .unwrap_or(0) as f64;

        let streak = self.find(pid).and_then(|p| p.streak).unwrap_or(0) as usize;
        let multiplier = STREAK_MULTIPLIER[streak.min(STREAK_MULTIPLIER.len() - 1)];

        ((base + time_bonus + position_bonus) * multiplier).round() as i64
    }

    // -----------------------------------------------------------------
    // submitVote / forceEndVoting (community mode)
    // -----------------------------------------------------------------

    pub fn submit_vote(
        &mut self,
        caller: &PersistentId,
        answer_author: &PersistentId,
        vote: Vote,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        if !self.is_community_voting_mode {
            return Err(RoomError::NotCommunityVotingMode);
        }
        if caller == answer_author {
            return Err(RoomError::SelfVote);
        }
        if !self.round_answers.contains_key(answer_author) {
            return Err(RoomError::ParticipantNotFound(answer_author.clone()));
        }
        let voter_active = self
            .find(caller)
            .map(|p| p.is_active && !p.is_spectator)
            .unwrap_or(false);
        if !voter_active {
            return Err(RoomError::NotActive);
        }
        let entry = self.votes.entry(answer_author.clone()).or_default();
        if entry.contains_key(caller) {
            return Err(RoomError::DuplicateVote);
        }
        entry.insert(caller.clone(), vote);

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::AnswerVoted {
            code: self.code.clone(),
            answer_author_id: answer_author.clone(),
            voter_id: caller.clone(),
            vote,
        });

        if self.all_votes_cast() {
            outbox.0.extend(self.finalize_votes(now).0);
        }
        Ok(Effect::new(self.finish(outbox)))
    }

    pub fn force_end_voting(
        &mut self,
        caller: &PersistentId,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        if !self.is_community_voting_mode {
            return Err(RoomError::NotCommunityVotingMode);
        }
        let outbox = self.finalize_votes(now);
        Ok(Effect::new(self.finish(outbox)))
    }

    /// "All possible votes cast": every submitted answer has one vote
    /// from every eligible voter except its own author.
    fn all_votes_cast(&self) -> bool {
        let eligible_voters: usize = self
            .participants
            .iter()
            .filter(|p| p.is_active && !p.is_spectator)
            .count();
        if eligible_voters == 0 {
            return false;
        }
        self.round_answers.keys().all(|author| {
            let cast = self.votes.get(author).map(|v| v.len()).unwrap_or(0);
            cast >= eligible_voters.saturating_sub(1)
        })
    }

    fn finalize_votes(&mut self, now: DateTime<Utc>) -> Outbox {
        if self.evaluated_answers.len() >= self.round_answers.len() && !self.round_answers.is_empty()
        {
            return Outbox::new();
        }
        let mut outbox = Outbox::new();
        let authors: Vec<PersistentId> = self.round_answers.keys().cloned().collect();
        for author in authors {
            let (correct, incorrect) = self
                .votes
                .get(&author)
                .map(|v| {
                    let c = v.values().filter(|v| **v == Vote::Correct).count();
                    let i = v.values().filter(|v| **v == Vote::Incorrect).count();
                    (c, i)
                })
                .unwrap_or((0, 0));
            // 0/0 defaults to correct; a tie defaults to incorrect.
            let is_correct = if correct == 0 && incorrect == 0 {
                true
            } else {
                correct > incorrect
            };
            self.apply_evaluation(&author, is_correct, now);
            if is_correct && author == self.gm_persistent_id {
                outbox.all(ServerEvent::GmCommunityAnswerAccepted {
                    code: self.code.clone(),
                    persistent_id: author.clone(),
                });
            }
        }
        outbox.0.extend(self.resolve_round(now).0);
        outbox
    }

    // -----------------------------------------------------------------
    // Resolved → record history, check end-of-game
    // -----------------------------------------------------------------

    fn resolve_round(&mut self, _now: DateTime<Utc>) -> Outbox {
        self.state = RoomState::Resolved;

        if let Some(question) = self.current_question() {
            self.history.push(RoundRecord {
                round_index: self.current_round_index,
                question_id: question.id.clone(),
                question_text: question.text.clone(),
                answers: self.round_answers.clone(),
                boards: self.player_boards.clone(),
            });
        }

        let mut outbox = Outbox::new();
        if self.end_of_game() {
            outbox.0.extend(self.conclude().0);
        }
        outbox
    }

    /// Spec §4.3.2.
    fn end_of_game(&self) -> bool {
        if !self.started {
            return false;
        }
        if self.is_community_voting_mode {
            let gm_active = self.gm_as_player().map(|p| p.is_active && !p.is_spectator).unwrap_or(false);
            let others = self.active_players().filter(|p| p.persistent_id != self.gm_persistent_id).count();
            (others == 0 && gm_active) || (others == 1 && !gm_active) || (others == 0 && !gm_active)
        } else {
            let active = self.active_players().count();
            let total_players = self
                .participants
                .iter()
                .filter(|p| p.role == ParticipantRole::Player)
                .count();
            total_players > 0 && active <= 1
        }
    }

    fn conclude(&mut self) -> Outbox {
        self.concluded = true;
        self.state = RoomState::Concluded;
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::GameOverPendingRecap {
            code: self.code.clone(),
        });
        outbox
    }

    // -----------------------------------------------------------------
    // nextQuestion
    // -----------------------------------------------------------------

    pub fn next_question(
        &mut self,
        caller: &PersistentId,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        if self.concluded {
            return Err(RoomError::AlreadyConcluded);
        }
        if self.current_round_index + 1 >= self.questions.len() as u32 {
            return Err(RoomError::NoNextQuestion);
        }

        self.current_round_index += 1;
        self.begin_round(now);

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::NewQuestion {
            code: self.code.clone(),
            question: self.current_question().cloned().unwrap_or_else(|| Question {
                id: String::new(),
                text: String::new(),
                question_type: QuestionType::Text,
                answer: None,
                grade: 0,
                subject: None,
                language: None,
            }),
            question_index: self.current_round_index,
        });
        Ok(Effect::new(self.finish(outbox)).with_timer(TimerDirective::Start(self.time_limit_seconds)))
    }

    // -----------------------------------------------------------------
    // restartGame
    // -----------------------------------------------------------------

    pub fn restart_game(
        &mut self,
        caller: &PersistentId,
        now: DateTime<Utc>,
    ) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }

        self.started = false;
        self.concluded = false;
        self.current_round_index = 0;
        self.questions.clear();
        self.history.clear();
        self.state = RoomState::Idle;
        self.begin_round(now);

        for p in self.participants.iter_mut() {
            if p.role != ParticipantRole::Player && p.score.is_none() {
                continue;
            }
            p.is_spectator = p.joined_as_spectator;
            p.lives = Some(if p.joined_as_spectator { 0 } else { INITIAL_LIVES });
            p.score = Some(0);
            p.streak = Some(0);
            p.last_points_earned = None;
            p.answers.clear();
        }

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::GameRestarted {
            code: self.code.clone(),
            state: self.snapshot(),
        });
        Ok(Effect::new(self.finish(outbox)).with_timer(TimerDirective::Cancel))
    }

    // -----------------------------------------------------------------
    // endGame / recap
    // -----------------------------------------------------------------

    pub fn end_game(&mut self, caller: &PersistentId) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        if self.concluded {
            return Err(RoomError::AlreadyConcluded);
        }
        let outbox = self.conclude();
        Ok(Effect::new(self.finish(outbox)).with_timer(TimerDirective::Cancel))
    }

    pub fn show_recap_to_all(&self, caller: &PersistentId, now: DateTime<Utc>) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::GameRecapEvent {
            code: self.code.clone(),
            recap: self.generate_recap(now),
        });
        Ok(Effect::new(outbox))
    }

    pub fn navigate_recap_round(&self, caller: &PersistentId, round_index: u32) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::RecapRoundChanged {
            code: self.code.clone(),
            round_index,
        });
        Ok(Effect::new(outbox))
    }

    pub fn navigate_recap_tab(&self, caller: &PersistentId, tab_key: String) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::RecapTabChanged {
            code: self.code.clone(),
            tab_key,
        });
        Ok(Effect::new(outbox))
    }

    /// Spec §4.3.3.
    fn generate_recap(&self, now: DateTime<Utc>) -> GameRecap {
        let rounds = self
            .history
            .iter()
            .filter(|r| !r.answers.is_empty())
            .map(|r| RecapRound {
                round_index: r.round_index,
                question_id: r.question_id.clone(),
                question_text: r.question_text.clone(),
                submissions: r
                    .answers
                    .values()
                    .map(|a| RecapSubmission {
                        persistent_id: a.persistent_id.clone(),
                        display_name: a.display_name.clone(),
                        text: a.text.clone(),
                        has_drawing: a.has_drawing,
                        drawing: a.drawing_blob.clone().or_else(|| {
                            r.boards.get(&a.persistent_id).map(|b| b.blob.clone())
                        }),
                        evaluation: a.evaluation,
                        points: a.points_awarded,
                    })
                    .collect(),
            })
            .collect();

        let mut standings: Vec<RecapStanding> = self
            .participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Player || p.score.is_some())
            .map(|p| RecapStanding {
                persistent_id: p.persistent_id.clone(),
                display_name: p.display_name.clone(),
                lives: p.lives.unwrap_or(0),
                is_active: p.is_active,
                score: p.score.unwrap_or(0),
                is_winner: false,
            })
            .collect();
        standings.sort_by(|a, b| {
            let a_active = a.is_active && a.lives > 0;
            let b_active = b.is_active && b.lives > 0;
            b_active
                .cmp(&a_active)
                .then(b.lives.cmp(&a.lives))
                .then(a.persistent_id.0.cmp(&b.persistent_id.0))
        });
        let active_count = standings.iter().filter(|s| s.is_active && s.lives > 0).count();
        if active_count == 1 {
            if let Some(winner) = standings.iter_mut().find(|s| s.is_active && s.lives > 0) {
                winner.is_winner = true;
            }
        }

        GameRecap {
            room_code: self.code.clone(),
            rounds,
            standings,
            initial_selected_round_index: 0,
            initial_selected_tab_key: GameRecap::DEFAULT_TAB_KEY.to_string(),
            generated_at: now,
        }
    }

    // -----------------------------------------------------------------
    // showAnswer
    // -----------------------------------------------------------------

    pub fn show_answer(&self, caller: &PersistentId, question_id: String) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        let answer_text = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .and_then(|q| q.answer.clone());
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::CorrectAnswerRevealed {
            code: self.code.clone(),
            question_id,
            answer_text,
        });
        Ok(Effect::new(outbox))
    }

    // -----------------------------------------------------------------
    // kickPlayer
    // -----------------------------------------------------------------

    pub fn kick_player(&mut self, caller: &PersistentId, target: &PersistentId) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        if target == caller || self.is_gm(target) {
            return Err(RoomError::Unauthorized);
        }
        let before = self.participants.len();
        self.participants.retain(|p| p.persistent_id != *target);
        if self.participants.len() == before {
            return Err(RoomError::ParticipantNotFound(target.clone()));
        }
        self.round_answers.remove(target);
        self.evaluated_answers.remove(target);
        self.player_boards.remove(target);
        self.votes.remove(target);
        for voters in self.votes.values_mut() {
            voters.remove(target);
        }

        let mut outbox = Outbox::new();
        outbox.only(
            target.clone(),
            ServerEvent::KickedFromRoom {
                code: self.code.clone(),
            },
        );
        Ok(Effect::new(self.finish(outbox)))
    }

    // -----------------------------------------------------------------
    // toggleCommunityVoting
    // -----------------------------------------------------------------

    pub fn toggle_community_voting(
        &mut self,
        caller: &PersistentId,
        on: bool,
    ) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        if on == self.is_community_voting_mode {
            let mut outbox = Outbox::new();
            outbox.all(ServerEvent::CommunityVotingStatusChanged {
                code: self.code.clone(),
                is_community_voting_mode: on,
            });
            return Ok(Effect::new(self.finish(outbox)));
        }
        if self.started {
            return Err(RoomError::GameAlreadyStarted);
        }

        self.is_community_voting_mode = on;
        let gm_persistent_id = self.gm_persistent_id.clone();
        let gm_display_name = self.gm_display_name.clone();
        if let Some(gm) = self.find_mut(&gm_persistent_id) {
            if on {
                gm.promote_to_playing_game_master();
            } else {
                gm.demote_from_playing_game_master(gm_display_name);
            }
        }

        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::CommunityVotingStatusChanged {
            code: self.code.clone(),
            is_community_voting_mode: on,
        });
        Ok(Effect::new(self.finish(outbox)))
    }

    // -----------------------------------------------------------------
    // updateAvatar
    // -----------------------------------------------------------------

    pub fn update_avatar(&mut self, pid: &PersistentId, avatar: Avatar) -> Result<Effect, RoomError> {
        let Some(p) = self.find_mut(pid) else {
            return Err(RoomError::ParticipantNotFound(pid.clone()));
        };
        p.avatar = Some(avatar.clone());
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::AvatarUpdated {
            code: self.code.clone(),
            persistent_id: pid.clone(),
            avatar,
        });
        Ok(Effect::new(self.finish(outbox)))
    }

    // -----------------------------------------------------------------
    // Board updates (GM board)
    // -----------------------------------------------------------------

    pub fn update_game_master_board(&mut self, caller: &PersistentId, board_data: String) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        self.gm_board_data = Some(board_data);
        Ok(Effect::new(self.finish(Outbox::new())))
    }

    pub fn clear_game_master_board(&mut self, caller: &PersistentId) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        self.gm_board_data = None;
        Ok(Effect::new(self.finish(Outbox::new())))
    }

    // -----------------------------------------------------------------
    // Start/stop preview mode, focus submission — stateless GM overlays
    // -----------------------------------------------------------------

    pub fn start_preview_mode(&self, caller: &PersistentId) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::StartPreviewMode {
            code: self.code.clone(),
            state: self.snapshot(),
        });
        Ok(Effect::new(outbox))
    }

    pub fn stop_preview_mode(&self, caller: &PersistentId) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::StopPreviewMode {
            code: self.code.clone(),
        });
        Ok(Effect::new(outbox))
    }

    pub fn focus_submission(&self, caller: &PersistentId, player_id: PersistentId) -> Result<Effect, RoomError> {
        if !self.is_gm(caller) {
            return Err(RoomError::Unauthorized);
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::FocusSubmission {
            code: self.code.clone(),
            player_id,
        });
        Ok(Effect::new(outbox))
    }

    // -----------------------------------------------------------------
    // Connection lifecycle hooks (called by the actor, not a ClientEvent)
    // -----------------------------------------------------------------

    pub fn mark_player_disconnected(&mut self, pid: &PersistentId) -> Effect {
        if let Some(p) = self.find_mut(pid) {
            p.is_active = false;
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::PlayerDisconnectedStatus {
            code: self.code.clone(),
            persistent_id: pid.clone(),
            is_active: false,
            temporary: true,
        });
        Effect::new(self.finish(outbox))
    }

    pub fn mark_player_reconnected(&mut self, pid: &PersistentId) -> Effect {
        if let Some(p) = self.find_mut(pid) {
            p.is_active = true;
        }
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::PlayerReconnectedStatus {
            code: self.code.clone(),
            persistent_id: pid.clone(),
            is_active: true,
        });
        Effect::new(self.finish(outbox))
    }

    pub fn remove_after_timeout(&mut self, pid: &PersistentId) -> Effect {
        self.participants.retain(|p| p.persistent_id != *pid);
        self.round_answers.remove(pid);
        self.player_boards.remove(pid);
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::PlayerRemovedAfterTimeout {
            code: self.code.clone(),
            persistent_id: pid.clone(),
        });
        Effect::new(self.finish(outbox))
    }

    pub fn player_left_gracefully(&mut self, pid: &PersistentId) -> Effect {
        self.participants.retain(|p| p.persistent_id != *pid);
        self.round_answers.remove(pid);
        self.player_boards.remove(pid);
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::PlayerLeftGracefully {
            code: self.code.clone(),
            persistent_id: pid.clone(),
        });
        Effect::new(self.finish(outbox))
    }

    pub fn mark_gm_disconnected(&mut self) -> Effect {
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::GmDisconnectedStatus {
            code: self.code.clone(),
            disconnected: true,
        });
        Effect::new(outbox)
    }

    pub fn mark_gm_reconnected(&mut self) -> Effect {
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::GmDisconnectedStatus {
            code: self.code.clone(),
            disconnected: false,
        });
        Effect::new(outbox)
    }

    // -----------------------------------------------------------------
    // getGameState
    // -----------------------------------------------------------------

    pub fn get_game_state(&self, caller: &PersistentId) -> Effect {
        let mut outbox = Outbox::new();
        outbox.only(caller.clone(), self.state_update());
        Effect::new(outbox)
    }

    // -----------------------------------------------------------------
    // Signaling relay (spec §4.6) — opaque forwarding, room-scoped
    // -----------------------------------------------------------------

    pub fn webrtc_ready(&mut self, caller: &PersistentId) -> Result<Effect, RoomError> {
        if !self.has_participant(caller) {
            return Err(RoomError::ParticipantNotFound(caller.clone()));
        }
        let others: Vec<PersistentId> = self
            .ready_peers
            .iter()
            .filter(|p| **p != *caller)
            .cloned()
            .collect();
        self.ready_peers.insert(caller.clone());

        let mut outbox = Outbox::new();
        outbox.only(
            caller.clone(),
            ServerEvent::WebrtcReady {
                code: self.code.clone(),
                ready_peers: others,
            },
        );
        outbox.all_except(
            caller.clone(),
            ServerEvent::WebrtcReady {
                code: self.code.clone(),
                ready_peers: vec![caller.clone()],
            },
        );
        Ok(Effect::new(outbox))
    }

    pub fn webrtc_offer(
        &self,
        caller: &PersistentId,
        to: PersistentId,
        sdp: serde_json::Value,
    ) -> Result<Effect, RoomError> {
        self.relay_to(&to, ServerEvent::WebrtcOffer {
            code: self.code.clone(),
            from: caller.clone(),
            sdp,
        })
    }

    pub fn webrtc_answer(
        &self,
        caller: &PersistentId,
        to: PersistentId,
        sdp: serde_json::Value,
    ) -> Result<Effect, RoomError> {
        self.relay_to(&to, ServerEvent::WebrtcAnswer {
            code: self.code.clone(),
            from: caller.clone(),
            sdp,
        })
    }

    pub fn webrtc_ice_candidate(
        &self,
        caller: &PersistentId,
        to: PersistentId,
        candidate: serde_json::Value,
    ) -> Result<Effect, RoomError> {
        self.relay_to(&to, ServerEvent::WebrtcIceCandidate {
            code: self.code.clone(),
            from: caller.clone(),
            candidate,
        })
    }

    fn relay_to(&self, to: &PersistentId, event: ServerEvent) -> Result<Effect, RoomError> {
        if !self.has_participant(to) {
            return Err(RoomError::ParticipantNotFound(to.clone()));
        }
        let mut outbox = Outbox::new();
        outbox.only(to.clone(), event);
        Ok(Effect::new(outbox))
    }

    pub fn webcam_state_change(&self, caller: &PersistentId, enabled: bool) -> Effect {
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::WebcamStateChange {
            code: self.code.clone(),
            persistent_id: caller.clone(),
            enabled,
        });
        Effect::new(outbox)
    }

    pub fn microphone_state_change(&self, caller: &PersistentId, enabled: bool) -> Effect {
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::MicrophoneStateChange {
            code: self.code.clone(),
            persistent_id: caller.clone(),
            enabled,
        });
        Effect::new(outbox)
    }

    /// GM disconnect grace expired (spec S4): conclude and evict.
    pub fn conclude_gm_timeout(&mut self) -> Effect {
        self.concluded = true;
        self.state = RoomState::Concluded;
        let mut outbox = Outbox::new();
        outbox.all(ServerEvent::RoomNotFound {
            code: self.code.clone(),
        });
        outbox.all(ServerEvent::GameOverPendingRecap {
            code: self.code.clone(),
        });
        Effect::new(outbox).evicting()
    }
}
