//! Unified error type for the quiz room server binary.

use quizroom_protocol::ProtocolError;
use quizroom_room::RoomError;
use quizroom_session::SessionError;
use quizroom_transport::TransportError;

/// Top-level error wrapping every sub-crate's error type, plus the
/// ambient concerns (snapshot I/O, configuration) the binary itself
/// owns. The `#[from]` attribute on each variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizRoomError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("snapshot I/O failed: {0}")]
    Snapshot(#[source] std::io::Error),

    #[error("failed to bind {0}: {1}")]
    Bind(std::net::SocketAddr, #[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let wrapped: QuizRoomError = err.into();
        assert!(matches!(wrapped, QuizRoomError::Transport(_)));
        assert!(wrapped.to_string().contains("gone"));
    }

    #[test]
    fn wraps_room_error() {
        let err = RoomError::Unauthorized;
        let wrapped: QuizRoomError = err.into();
        assert!(matches!(wrapped, QuizRoomError::Room(_)));
    }

    #[test]
    fn wraps_session_error() {
        let err = SessionError::AuthFailed("nope".into());
        let wrapped: QuizRoomError = err.into();
        assert!(matches!(wrapped, QuizRoomError::Session(_)));
    }
}
