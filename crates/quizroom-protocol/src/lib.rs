//! Wire protocol for the quiz room server.
//!
//! This crate defines the "language" clients and the server speak:
//!
//! - **Identity/domain types** ([`RoomCode`], [`PersistentId`], [`Question`],
//!   [`Answer`], [`BoardSnapshot`]) — the data that makes up a room.
//! - **Participant** ([`Participant`]) — a game master or player seat.
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`GameStateSnapshot`]) —
//!   the tagged message vocabulary exchanged over the connection.
//! - **Recap** ([`GameRecap`]) — the end-of-game summary.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events are converted
//!   to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! engine (game state); it doesn't know about connections or rooms beyond
//! the identifiers it defines.

mod codec;
mod error;
mod events;
mod participant;
mod recap;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, GameStateSnapshot, ServerEvent};
pub use participant::{Participant, ParticipantRole};
pub use recap::{GameRecap, RecapRound, RecapStanding, RecapSubmission};
pub use types::{
    Answer, Avatar, BoardSnapshot, ConnectionId, Evaluation, PersistentId, Question,
    QuestionType, RoomCode, Vote,
};
