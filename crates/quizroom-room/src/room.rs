//! Room actor: an isolated Tokio task that owns one [`Engine`] instance.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. This is the "actor model" — no shared mutable
//! state, just message passing. The actor is the only thing that touches
//! wall-clock time, the [`SessionManager`], and per-connection senders;
//! [`Engine`] itself stays a pure, synchronous state machine.

use std::collections::HashMap;

use chrono::Utc;
use quizroom_protocol::{ClientEvent, GameRecap, GameStateSnapshot, PersistentId, RoomCode, ServerEvent};
use quizroom_session::{ParticipantRole as SessionRole, SessionManager};
use quizroom_tick::{GraceDelay, RoundTimer, TimerEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};

use crate::engine::{Effect, Engine, Recipient, TimerDirective};
use crate::persist::RoomPersistedState;
use crate::{RoomConfig, RoomError};

/// Per-connection outbound channel. The dispatcher (bin crate) owns the
/// receiving half and forwards events onto the actual socket.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// A point-in-time summary of a room, cheap to snapshot for the registry's
/// debug endpoint and stale sweep.
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub code: RoomCode,
    pub started: bool,
    pub concluded: bool,
    pub player_count: usize,
    pub last_activity: chrono::DateTime<Utc>,
    pub current_round_index: u32,
}

/// Commands accepted by a running room actor.
pub enum RoomCommand {
    /// `createRoom`'s GM attach, `joinRoom`, or `rejoinRoom`: bind a
    /// connection's outbound sender to a participant seat.
    Join {
        pid: PersistentId,
        role: SessionRole,
        display_name: String,
        is_spectator: bool,
        avatar: Option<String>,
        sender: EventSender,
        reply: oneshot::Sender<Result<GameStateSnapshot, RoomError>>,
    },
    /// Any other client event, already authorized to a resolved caller.
    Dispatch {
        caller: PersistentId,
        event: ClientEvent,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    DisconnectAbrupt {
        pid: PersistentId,
    },
    DisconnectGraceful {
        pid: PersistentId,
    },
    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },
    /// `createRoom` with an explicit, already-registered code: rebind the
    /// GM seat to the new caller (spec §4.2's reclaim path) before the
    /// caller's ordinary `Join` lands.
    ReclaimGm {
        new_gm: PersistentId,
        display_name: String,
        reply: oneshot::Sender<()>,
    },
    /// The snapshot store's periodic and critical-event export (spec
    /// §4.5). Returns `None` for a concluded room — the store only
    /// persists live rooms.
    Export {
        reply: oneshot::Sender<Option<RoomPersistedState>>,
    },
    /// The HTTP recap mirror (spec §6.3): render the current recap on
    /// demand, independent of whether any GM has asked for it over the
    /// socket yet.
    Recap {
        reply: oneshot::Sender<GameRecap>,
    },
    Shutdown,
}

/// A cheap, cloneable handle to a running room actor.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn join(
        &self,
        pid: PersistentId,
        role: SessionRole,
        display_name: String,
        is_spectator: bool,
        avatar: Option<String>,
        sender: EventSender,
    ) -> Result<GameStateSnapshot, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                pid,
                role,
                display_name,
                is_spectator,
                avatar,
                sender,
                reply,
            })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)?
    }

    pub async fn dispatch(&self, caller: PersistentId, event: ClientEvent) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Dispatch { caller, event, reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)?
    }

    pub async fn disconnect_abrupt(&self, pid: PersistentId) {
        let _ = self.sender.send(RoomCommand::DisconnectAbrupt { pid }).await;
    }

    pub async fn disconnect_graceful(&self, pid: PersistentId) {
        let _ = self.sender.send(RoomCommand::DisconnectGraceful { pid }).await;
    }

    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Summary { reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn reclaim_gm(&self, new_gm: PersistentId, display_name: String) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::ReclaimGm { new_gm, display_name, reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn export(&self) -> Result<Option<RoomPersistedState>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Export { reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn recap(&self) -> Result<GameRecap, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Recap { reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(RoomCommand::Shutdown).await;
    }
}

/// The actor's private state. Lives entirely inside [`run`].
struct RoomActor {
    engine: Engine,
    config: RoomConfig,
    sessions: SessionManager,
    senders: HashMap<PersistentId, EventSender>,
    receiver: mpsc::Receiver<RoomCommand>,
    timer: Option<RoundTimer>,
    grace: GraceDelay,
}

async fn wait_timer(timer: &mut Option<RoundTimer>) -> TimerEvent {
    match timer {
        Some(t) => t.wait_tick().await,
        None => std::future::pending().await,
    }
}

impl RoomActor {
    async fn run(mut self) {
        let code = self.engine.code.clone();
        tracing::info!(%code, "room actor started");

        let mut sweep = time::interval(self.config.session_sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(RoomCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                event = wait_timer(&mut self.timer) => {
                    self.handle_timer_event(event);
                }
                _ = self.grace.wait() => {
                    let effect = self.engine.finalize_submission_phase(Utc::now());
                    self.apply(effect);
                }
                _ = sweep.tick() => {
                    self.handle_sweep();
                }
            }

            if self.engine.state() == crate::RoomState::Concluded && self.senders.is_empty() {
                break;
            }
        }

        tracing::info!(%code, "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                pid,
                role,
                display_name,
                is_spectator,
                avatar,
                sender,
                reply,
            } => {
                let result = self.handle_join(pid, role, display_name, is_spectator, avatar, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Dispatch { caller, event, reply } => {
                let result = self.handle_dispatch(caller, event);
                let _ = reply.send(result);
            }
            RoomCommand::DisconnectAbrupt { pid } => self.handle_disconnect_abrupt(pid),
            RoomCommand::DisconnectGraceful { pid } => self.handle_disconnect_graceful(pid),
            RoomCommand::Summary { reply } => {
                let _ = reply.send(self.summary());
            }
            RoomCommand::ReclaimGm { new_gm, display_name, reply } => {
                self.engine.reclaim_gm(new_gm, display_name);
                self.engine.touch(Utc::now());
                let _ = reply.send(());
            }
            RoomCommand::Export { reply } => {
                let exported = (!self.engine.concluded).then(|| self.engine.to_persisted(Utc::now()));
                let _ = reply.send(exported);
            }
            RoomCommand::Recap { reply } => {
                let _ = reply.send(self.engine.recap(Utc::now()));
            }
            RoomCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    fn handle_join(
        &mut self,
        pid: PersistentId,
        role: SessionRole,
        display_name: String,
        is_spectator: bool,
        avatar: Option<String>,
        sender: EventSender,
    ) -> Result<GameStateSnapshot, RoomError> {
        self.sessions
            .connect(pid.clone(), role)
            .map_err(|_| RoomError::AlreadyConnected(pid.clone()))?;
        self.senders.insert(pid.clone(), sender);

        let is_gm = self.engine.is_gm(&pid);
        let effect = if is_gm {
            self.engine.mark_gm_reconnected()
        } else {
            match self
                .engine
                .join_player(&pid, &display_name, is_spectator, avatar, false)
            {
                Ok(effect) => effect,
                Err(err) => {
                    self.senders.remove(&pid);
                    return Err(err);
                }
            }
        };
        self.engine.touch(Utc::now());
        self.apply(effect);
        Ok(self.engine.snapshot())
    }

    fn handle_dispatch(&mut self, caller: PersistentId, event: ClientEvent) -> Result<(), RoomError> {
        self.engine.touch(Utc::now());
        let now = Utc::now();
        let effect = match event {
            ClientEvent::CreateRoom { .. } | ClientEvent::JoinRoom { .. } | ClientEvent::RejoinRoom { .. } => {
                return Err(RoomError::Unauthorized);
            }
            ClientEvent::StartGame { questions, time_limit, .. } => {
                self.engine.start_game(&caller, questions, time_limit, now)?
            }
            ClientEvent::SubmitAnswer {
                answer,
                has_drawing,
                drawing_data,
                answer_attempt_id,
                ..
            } => self.engine.submit_answer(
                &caller,
                answer,
                has_drawing.unwrap_or(false),
                drawing_data,
                answer_attempt_id,
                now,
            )?,
            ClientEvent::UpdateBoard { board_data, .. } => {
                self.engine.update_board(&caller, board_data, now)?
            }
            ClientEvent::EvaluateAnswer { player_id, is_correct, .. } => {
                self.engine.evaluate_answer(&caller, &player_id, is_correct, now)?
            }
            ClientEvent::NextQuestion { .. } => self.engine.next_question(&caller, now)?,
            ClientEvent::EndRoundEarly { .. } => self.engine.end_round_early(&caller)?,
            ClientEvent::RestartGame { .. } => self.engine.restart_game(&caller, now)?,
            ClientEvent::StartPreviewMode { .. } => self.engine.start_preview_mode(&caller)?,
            ClientEvent::StopPreviewMode { .. } => self.engine.stop_preview_mode(&caller)?,
            ClientEvent::FocusSubmission { player_id, .. } => {
                self.engine.focus_submission(&caller, player_id)?
            }
            ClientEvent::KickPlayer { player_id_to_kick, .. } => {
                self.engine.kick_player(&caller, &player_id_to_kick)?
            }
            ClientEvent::ToggleCommunityVoting { is_community_voting_mode, .. } => self
                .engine
                .toggle_community_voting(&caller, is_community_voting_mode)?,
            ClientEvent::SubmitVote { answer_id, vote, .. } => {
                self.engine.submit_vote(&caller, &answer_id, vote, now)?
            }
            ClientEvent::ShowAnswer { question_id, .. } => {
                self.engine.show_answer(&caller, question_id)?
            }
            ClientEvent::ForceEndVoting { .. } => self.engine.force_end_voting(&caller, now)?,
            ClientEvent::UpdateGameMasterBoard { board_data, .. } => {
                self.engine.update_game_master_board(&caller, board_data)?
            }
            ClientEvent::ClearGameMasterBoard { .. } => self.engine.clear_game_master_board(&caller)?,
            ClientEvent::UpdateAvatar { persistent_player_id, avatar, .. } => {
                self.engine.update_avatar(&persistent_player_id, avatar)?
            }
            ClientEvent::GetGameState { .. } => self.engine.get_game_state(&caller),
            ClientEvent::GmEndGameRequest { .. } => self.engine.end_game(&caller)?,
            ClientEvent::GmShowRecapToAll { .. } => self.engine.show_recap_to_all(&caller, now)?,
            ClientEvent::GmNavigateRecapRound { round_index, .. } => {
                self.engine.navigate_recap_round(&caller, round_index)?
            }
            ClientEvent::GmNavigateRecapTab { tab_key, .. } => {
                self.engine.navigate_recap_tab(&caller, tab_key)?
            }
            ClientEvent::WebrtcReady { .. } => self.engine.webrtc_ready(&caller)?,
            ClientEvent::WebrtcOffer { to, sdp, .. } => self.engine.webrtc_offer(&caller, to, sdp)?,
            ClientEvent::WebrtcAnswer { to, sdp, .. } => self.engine.webrtc_answer(&caller, to, sdp)?,
            ClientEvent::WebrtcIceCandidate { to, candidate, .. } => {
                self.engine.webrtc_ice_candidate(&caller, to, candidate)?
            }
            ClientEvent::WebcamStateChange { enabled, .. } => {
                self.engine.webcam_state_change(&caller, enabled)
            }
            ClientEvent::MicrophoneStateChange { enabled, .. } => {
                self.engine.microphone_state_change(&caller, enabled)
            }
        };
        self.apply(effect);
        Ok(())
    }

    fn handle_disconnect_abrupt(&mut self, pid: PersistentId) {
        self.senders.remove(&pid);
        if self.sessions.disconnect_abrupt(&pid).is_err() {
            return;
        }
        let effect = if self.engine.is_gm(&pid) {
            self.engine.mark_gm_disconnected()
        } else {
            self.engine.mark_player_disconnected(&pid)
        };
        self.apply(effect);
    }

    fn handle_disconnect_graceful(&mut self, pid: PersistentId) {
        self.senders.remove(&pid);
        self.sessions.disconnect_graceful(&pid);
        let effect = if self.engine.is_gm(&pid) {
            self.engine.mark_gm_disconnected()
        } else {
            self.engine.player_left_gracefully(&pid)
        };
        self.apply(effect);
    }

    fn handle_timer_event(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick(remaining) => {
                self.broadcast(ServerEvent::TimerUpdate {
                    code: self.engine.code.clone(),
                    time_remaining: remaining,
                });
            }
            TimerEvent::Expired => {
                self.timer = None;
                let effect = self.engine.handle_timeout();
                self.apply(effect);
            }
        }
    }

    fn handle_sweep(&mut self) {
        let expired = self.sessions.expire_stale();
        for pid in expired {
            self.senders.remove(&pid);
            let effect = if self.engine.is_gm(&pid) {
                self.engine.conclude_gm_timeout()
            } else {
                self.engine.remove_after_timeout(&pid)
            };
            self.apply(effect);
        }
        self.sessions.cleanup_expired();
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.engine.code.clone(),
            started: self.engine.started,
            concluded: self.engine.concluded,
            player_count: self.senders.len(),
            last_activity: self.engine.last_activity,
            current_round_index: self.engine.current_round_index(),
        }
    }

    /// Dispatches an [`Effect`]'s outbox to sockets and actions its timer
    /// directive.
    fn apply(&mut self, effect: Effect) {
        for (recipient, event) in effect.outbox.0 {
            match recipient {
                Recipient::All => self.broadcast(event),
                Recipient::Only(pid) => self.send_to(&pid, event),
                Recipient::AllExcept(excluded) => {
                    let targets: Vec<PersistentId> = self
                        .senders
                        .keys()
                        .filter(|pid| **pid != excluded)
                        .cloned()
                        .collect();
                    for pid in targets {
                        self.send_to(&pid, event.clone());
                    }
                }
            }
        }

        match effect.timer {
            TimerDirective::Unchanged => {}
            TimerDirective::Start(limit) => {
                self.timer = RoundTimer::start(limit);
                self.grace.cancel();
            }
            TimerDirective::Cancel => {
                self.timer = None;
                self.grace.cancel();
            }
            TimerDirective::ArmGrace => {
                self.timer = None;
                self.grace = GraceDelay::arm(self.config.auto_submit_grace);
            }
        }

        if effect.evict {
            self.senders.clear();
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn send_to(&self, pid: &PersistentId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(pid) {
            let _ = sender.send(event);
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with
/// it. `code` and `gm_persistent_id` bind the GM at creation time, per
/// `createRoom`'s precondition.
pub fn spawn_room(
    code: RoomCode,
    gm_persistent_id: PersistentId,
    gm_display_name: String,
    is_streamer_mode: bool,
    is_points_mode: bool,
    config: RoomConfig,
) -> RoomHandle {
    let channel_size = config.channel_size;
    let (tx, rx) = mpsc::channel(channel_size);

    let engine = Engine::new(
        code.clone(),
        gm_persistent_id,
        gm_display_name,
        is_streamer_mode,
        is_points_mode,
        Utc::now(),
    );

    let actor = RoomActor {
        engine,
        config,
        sessions: SessionManager::new(),
        senders: HashMap::new(),
        receiver: rx,
        timer: None,
        grace: GraceDelay::idle(),
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}

/// Bootstraps a room actor from a loaded snapshot (spec §4.5). No timer
/// is armed regardless of the persisted time limit — every participant
/// comes back `isActive=false` and must reconnect before play resumes.
pub fn spawn_room_from_persisted(state: RoomPersistedState, config: RoomConfig) -> RoomHandle {
    let code = state.code.clone();
    let channel_size = config.channel_size;
    let (tx, rx) = mpsc::channel(channel_size);

    let engine = Engine::from_persisted(state);

    let actor = RoomActor {
        engine,
        config,
        sessions: SessionManager::new(),
        senders: HashMap::new(),
        receiver: rx,
        timer: None,
        grace: GraceDelay::idle(),
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
