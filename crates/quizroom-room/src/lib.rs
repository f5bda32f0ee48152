//! Room registry and round-state engine for the quiz room server.
//!
//! This crate is the authoritative home of spec §3's `Room` data model
//! and spec §4.3's round state machine:
//!
//! - [`Engine`] — the synchronous state machine for one room (round
//!   lifecycle, submissions, evaluation, lives/points, recap).
//! - [`room`] — the actor that wraps an `Engine` in its own Tokio task,
//!   owning the wall clock, the round timer, and per-connection senders.
//! - [`RoomRegistry`] — the process-wide map from [`quizroom_protocol::RoomCode`]
//!   to a running room actor, plus the stale-room sweep (spec §4.2).
//! - [`persist`] — the ephemeral-field-free projection a snapshot store
//!   persists and restores (spec §4.5).
//! - [`RoomConfig`] / [`RoomState`] — shared actor configuration and the
//!   round lifecycle enum.
//! - [`RoomError`] — spec §7's error kinds.

mod config;
mod engine;
mod error;
mod manager;
pub mod persist;
mod room;

pub use config::{RoomConfig, RoomState};
pub use engine::{Effect, Engine, Recipient, TimerDirective};
pub use error::RoomError;
pub use manager::{RoomRegistry, RoomRegistryConfig};
pub use persist::RoomPersistedState;
pub use room::{spawn_room, spawn_room_from_persisted, EventSender, RoomCommand, RoomHandle, RoomSummary};
