//! Session types: the server's record of a connected participant.
//!
//! A "session" tracks WHO a participant is (`PersistentId`), WHAT
//! connection state they're in (connected, disconnected, expired), and
//! WHEN their grace period runs out if disconnected.

use std::time::{Duration, Instant};

use quizroom_protocol::ConnectionId;

use crate::identity::ParticipantRole;

/// Disconnect grace period for a Player: 2 minutes 15 seconds.
pub const PLAYER_GRACE: Duration = Duration::from_secs(2 * 60 + 15);

/// Disconnect grace period for the Game Master: 2 minutes 10 seconds,
/// slightly shorter because a GM-less room is unusable to every player
/// in it and should be reclaimed sooner.
pub const GM_GRACE: Duration = Duration::from_secs(2 * 60 + 10);

/// Returns the grace period that applies to a disconnect, by role.
/// Fallback (pre-naming) connections get the player grace period — they
/// haven't committed to a seat yet, so there's nothing more lenient to do.
pub fn grace_period_for(role: ParticipantRole) -> Duration {
    match role {
        ParticipantRole::GameMaster => GM_GRACE,
        ParticipantRole::Player | ParticipantRole::Fallback => PLAYER_GRACE,
    }
}

/// The current state of a participant's session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapses)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Actively connected, with the current connection's id.
    Connected(ConnectionId),

    /// Disconnected at `since`; has until `since + grace` to reconnect.
    Disconnected { since: Instant },

    /// Grace period elapsed. Ready for the caller to evict the seat.
    Expired,
}

/// A single participant's session, keyed externally by `PersistentId`.
#[derive(Debug, Clone)]
pub struct Session {
    pub role: ParticipantRole,
    pub state: SessionState,
}

impl Session {
    pub fn connected(role: ParticipantRole, connection_id: ConnectionId) -> Self {
        Session {
            role,
            state: SessionState::Connected(connection_id),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self.state {
            SessionState::Connected(id) => Some(id),
            _ => None,
        }
    }

    /// Grace deadline for a currently-disconnected session, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SessionState::Disconnected { since } => Some(since + grace_period_for(self.role)),
            _ => None,
        }
    }
}
