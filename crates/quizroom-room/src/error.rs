//! Error types for the room layer (spec §7).

use quizroom_protocol::{PersistentId, RoomCode};

/// Errors that can occur during room operations. Every variant maps to
/// exactly one of the error kinds in spec §7: `NotFound`, `Unauthorized`,
/// `Conflict`, `InvalidPhase`, `RateOrSizeLimit`, `Internal`.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    // -- NotFound --
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),
    #[error("participant {0} not found in room")]
    ParticipantNotFound(PersistentId),

    // -- Unauthorized --
    #[error("caller is not authorized to perform this operation")]
    Unauthorized,

    // -- Conflict --
    #[error("display name {0:?} is already taken")]
    NameTaken(String),
    #[error("participant {0} is already connected from another tab/device")]
    AlreadyConnected(PersistentId),
    #[error("duplicate submission with a different attempt id")]
    DuplicateSubmission,

    // -- InvalidPhase --
    #[error("submission phase is over for this round")]
    SubmissionPhaseOver,
    #[error("the game has not started")]
    NotStarted,
    #[error("this operation requires community voting mode")]
    NotCommunityVotingMode,
    #[error("this operation is not allowed in community voting mode")]
    CommunityVotingModeActive,
    #[error("the caller is a spectator and cannot submit")]
    IsSpectator,
    #[error("the caller is not currently active")]
    NotActive,
    #[error("cannot vote on your own answer")]
    SelfVote,
    #[error("already voted on this answer")]
    DuplicateVote,
    #[error("there is no next question")]
    NoNextQuestion,
    #[error("the game has already concluded")]
    AlreadyConcluded,
    #[error("community voting mode can only be toggled before the game starts")]
    GameAlreadyStarted,

    // -- RateOrSizeLimit --
    #[error("payload exceeds the 5 MB per-event cap")]
    PayloadTooLarge,

    // -- Internal --
    #[error("room actor is unavailable")]
    Unavailable,
}
