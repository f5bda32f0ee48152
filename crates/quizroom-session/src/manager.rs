//! The session registry: tracks every participant's connection state.
//!
//! Not thread-safe by design — exactly one task owns a `SessionManager`
//! (the room actor, or a shared connection registry guarded the same way
//! the room registry is), so interior mutability and locking are the
//! caller's problem, not this type's.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use quizroom_protocol::{ConnectionId, PersistentId};

use crate::identity::ParticipantRole;
use crate::session::{grace_period_for, Session, SessionState};
use crate::SessionError;

/// Tracks every participant's session, keyed by their stable
/// [`PersistentId`].
pub struct SessionManager {
    sessions: HashMap<PersistentId, Session>,
    next_connection_id: u64,
    /// Test-only override so expiry tests don't need to sleep for real
    /// minutes. `None` in production: the role-based constants apply.
    grace_override: Option<Duration>,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            sessions: HashMap::new(),
            next_connection_id: 1,
            grace_override: None,
        }
    }

    #[cfg(test)]
    pub fn with_grace_override(grace: Duration) -> Self {
        let mut manager = Self::new();
        manager.grace_override = Some(grace);
        manager
    }

    fn mint_connection_id(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        id
    }

    /// Binds a connection to `persistent_id`.
    ///
    /// - If no session exists, or the existing one is `Expired`, a fresh
    ///   `Connected` session is created.
    /// - If the existing session is `Disconnected`, this is a reconnect:
    ///   the pending deadline is cancelled and the session becomes
    ///   `Connected` again under a new `ConnectionId`.
    /// - If the existing session is already `Connected`, the caller must
    ///   first check whether that prior connection is still live (S6);
    ///   this method itself refuses with [`SessionError::AlreadyConnected`]
    ///   so the duplicate-join check always happens explicitly.
    pub fn connect(
        &mut self,
        persistent_id: PersistentId,
        role: ParticipantRole,
    ) -> Result<ConnectionId, SessionError> {
        if let Some(existing) = self.sessions.get(&persistent_id) {
            if existing.is_active() {
                return Err(SessionError::AlreadyConnected(persistent_id));
            }
        }
        let connection_id = self.mint_connection_id();
        self.sessions
            .insert(persistent_id, Session::connected(role, connection_id));
        Ok(connection_id)
    }

    /// Marks a participant disconnected (transport drop, not a graceful
    /// leave), arming their role-appropriate grace deadline.
    pub fn disconnect_abrupt(&mut self, persistent_id: &PersistentId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(persistent_id)
            .ok_or_else(|| SessionError::NotFound(persistent_id.clone()))?;
        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };
        Ok(())
    }

    /// Removes a participant's session immediately — used for a graceful
    /// client-initiated leave, where there is no grace period to honor.
    pub fn disconnect_graceful(&mut self, persistent_id: &PersistentId) {
        self.sessions.remove(persistent_id);
    }

    pub fn is_connected(&self, persistent_id: &PersistentId) -> bool {
        self.sessions
            .get(persistent_id)
            .map(Session::is_active)
            .unwrap_or(false)
    }

    pub fn get(&self, persistent_id: &PersistentId) -> Option<&Session> {
        self.sessions.get(persistent_id)
    }

    pub fn remove(&mut self, persistent_id: &PersistentId) -> Option<Session> {
        self.sessions.remove(persistent_id)
    }

    /// Scans for disconnected sessions whose grace deadline has elapsed,
    /// transitions them to `Expired`, and returns their ids so the caller
    /// (the room engine) can evict the corresponding participant.
    pub fn expire_stale(&mut self) -> Vec<PersistentId> {
        let now = Instant::now();
        let grace_override = self.grace_override;
        let mut expired = Vec::new();
        for (pid, session) in self.sessions.iter_mut() {
            if let SessionState::Disconnected { since } = session.state {
                let grace = grace_override.unwrap_or_else(|| grace_period_for(session.role));
                if now >= since + grace {
                    session.state = SessionState::Expired;
                    expired.push(pid.clone());
                }
            }
        }
        expired
    }

    /// Drops every session in the `Expired` state. Call after acting on
    /// the ids returned by [`Self::expire_stale`].
    pub fn cleanup_expired(&mut self) {
        self.sessions
            .retain(|_, session| !matches!(session.state, SessionState::Expired));
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(label: &str) -> PersistentId {
        PersistentId(format!("P-{label}"))
    }

    fn manager_with_instant_expiry() -> SessionManager {
        SessionManager::with_grace_override(Duration::from_millis(0))
    }

    fn manager_with_long_grace() -> SessionManager {
        SessionManager::with_grace_override(Duration::from_secs(3600))
    }

    #[test]
    fn connect_assigns_a_connection_id() {
        let mut manager = SessionManager::new();
        let id = manager.connect(pid("a"), ParticipantRole::Player).unwrap();
        assert_eq!(id, ConnectionId(1));
        assert!(manager.is_connected(&pid("a")));
    }

    #[test]
    fn duplicate_connect_while_still_active_is_rejected() {
        let mut manager = SessionManager::new();
        manager.connect(pid("a"), ParticipantRole::Player).unwrap();
        let err = manager.connect(pid("a"), ParticipantRole::Player).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyConnected(_)));
    }

    #[test]
    fn reconnect_after_disconnect_cancels_the_deadline() {
        let mut manager = manager_with_long_grace();
        manager.connect(pid("a"), ParticipantRole::Player).unwrap();
        manager.disconnect_abrupt(&pid("a")).unwrap();
        assert!(!manager.is_connected(&pid("a")));

        let new_id = manager.connect(pid("a"), ParticipantRole::Player).unwrap();
        assert!(manager.is_connected(&pid("a")));
        assert_eq!(new_id, ConnectionId(2));

        // expire_stale should find nothing: the disconnect was cancelled.
        assert!(manager.expire_stale().is_empty());
    }

    #[test]
    fn expire_stale_evicts_past_the_grace_deadline() {
        let mut manager = manager_with_instant_expiry();
        manager.connect(pid("a"), ParticipantRole::Player).unwrap();
        manager.disconnect_abrupt(&pid("a")).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let expired = manager.expire_stale();
        assert_eq!(expired, vec![pid("a")]);

        manager.cleanup_expired();
        assert!(manager.get(&pid("a")).is_none());
    }

    #[test]
    fn graceful_disconnect_removes_immediately_with_no_grace() {
        let mut manager = manager_with_long_grace();
        manager.connect(pid("a"), ParticipantRole::Player).unwrap();
        manager.disconnect_graceful(&pid("a"));
        assert!(manager.get(&pid("a")).is_none());
    }

    #[test]
    fn disconnecting_an_unknown_participant_is_an_error() {
        let mut manager = SessionManager::new();
        let err = manager.disconnect_abrupt(&pid("ghost")).unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn game_master_and_player_get_different_grace_periods() {
        assert!(
            grace_period_for(ParticipantRole::GameMaster)
                < grace_period_for(ParticipantRole::Player)
        );
    }
}
