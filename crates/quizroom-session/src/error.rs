//! Error types for the session layer.

use quizroom_protocol::PersistentId;

/// Errors that can occur during identity resolution and session
/// management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The handshake was rejected by the acceptance policy — no initial
    /// connection flag, no game-master flag, no transport-level recovery,
    /// and no display name to mint a player identity from.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for the given participant.
    #[error("session not found for participant {0}")]
    NotFound(PersistentId),

    /// The participant already has an active (`Connected`) session from
    /// another socket — the duplicate-join case (spec scenario S6).
    #[error("participant {0} already connected from another tab/device")]
    AlreadyConnected(PersistentId),
}
