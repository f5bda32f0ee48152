//! Identity resolution: turning handshake parameters into a
//! [`PersistentId`] + role + display name, per the provenance rules a
//! connection is classified under.
//!
//! This crate doesn't implement end-user authentication — there is no
//! identity provider to check a credential against. Its only job is the
//! mint/reuse/reject policy the handshake runs through every time a
//! socket connects.

use quizroom_protocol::PersistentId;

use crate::SessionError;

/// The role a connection was classified as, derived from the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    GameMaster,
    Player,
    /// A transient identity for a connection that hasn't named itself yet
    /// (e.g. still on the join screen).
    Fallback,
}

/// The parameters a connecting socket's handshake carries.
#[derive(Debug, Clone, Default)]
pub struct HandshakeParams {
    pub auth_persistent_id: Option<PersistentId>,
    pub auth_display_name: Option<String>,
    pub is_game_master: bool,
    pub is_initial_connection: bool,
    /// Set when the transport layer recovered this socket from a prior
    /// connection (e.g. polling-to-websocket upgrade, brief drop) rather
    /// than treating it as a fresh handshake.
    pub recovered_by_transport: bool,
}

/// The identity assigned to a connection after running the handshake
/// through [`resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub persistent_id: PersistentId,
    pub role: ParticipantRole,
    pub display_name: String,
}

/// Resolves `(persistentId, role, displayName)` from handshake parameters,
/// per spec §4.1:
///
/// - `isGameMaster` mints a fresh `GM-*` identity every time — GM identity
///   is per-session, never reused across new GM sessions.
/// - Else, a supplied `auth.persistentId` is reused verbatim.
/// - Else, a supplied `auth.displayName` mints a fresh `P-*` identity.
/// - Else, a transient `F-*` identity is minted for bootstrap connections.
///
/// Acceptance policy: accepted if `isInitialConnection`, `isGameMaster`,
/// the socket was recovered by transport-level reconnection, or a display
/// name was supplied. Otherwise rejected.
pub fn resolve(params: &HandshakeParams) -> Result<ResolvedIdentity, SessionError> {
    let accepted = params.is_initial_connection
        || params.is_game_master
        || params.recovered_by_transport
        || params.auth_display_name.is_some();

    if !accepted {
        return Err(SessionError::AuthFailed("Player name required".into()));
    }

    if params.is_game_master {
        return Ok(ResolvedIdentity {
            persistent_id: PersistentId::new_game_master(),
            role: ParticipantRole::GameMaster,
            display_name: "GameMaster".to_string(),
        });
    }

    if let Some(pid) = &params.auth_persistent_id {
        let role = if pid.is_game_master() {
            ParticipantRole::GameMaster
        } else if pid.is_fallback() {
            ParticipantRole::Fallback
        } else {
            ParticipantRole::Player
        };
        return Ok(ResolvedIdentity {
            persistent_id: pid.clone(),
            role,
            display_name: params
                .auth_display_name
                .clone()
                .unwrap_or_else(|| pid.to_string()),
        });
    }

    if let Some(name) = &params.auth_display_name {
        return Ok(ResolvedIdentity {
            persistent_id: PersistentId::new_player(),
            role: ParticipantRole::Player,
            display_name: name.clone(),
        });
    }

    Ok(ResolvedIdentity {
        persistent_id: PersistentId::new_fallback(),
        role: ParticipantRole::Fallback,
        display_name: "Guest".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> HandshakeParams {
        HandshakeParams::default()
    }

    #[test]
    fn game_master_always_mints_fresh_identity() {
        let params = HandshakeParams {
            is_game_master: true,
            auth_persistent_id: Some(PersistentId("GM-stale".into())),
            ..base()
        };
        let resolved = resolve(&params).unwrap();
        assert_eq!(resolved.role, ParticipantRole::GameMaster);
        assert_ne!(resolved.persistent_id, PersistentId("GM-stale".into()));
        assert_eq!(resolved.display_name, "GameMaster");
    }

    #[test]
    fn reuses_supplied_persistent_id_verbatim() {
        let params = HandshakeParams {
            auth_persistent_id: Some(PersistentId("P-existing".into())),
            is_initial_connection: true,
            ..base()
        };
        let resolved = resolve(&params).unwrap();
        assert_eq!(resolved.persistent_id, PersistentId("P-existing".into()));
        assert_eq!(resolved.role, ParticipantRole::Player);
    }

    #[test]
    fn display_name_alone_mints_player_id() {
        let params = HandshakeParams {
            auth_display_name: Some("alice".into()),
            ..base()
        };
        let resolved = resolve(&params).unwrap();
        assert!(resolved.persistent_id.0.starts_with("P-"));
        assert_eq!(resolved.display_name, "alice");
    }

    #[test]
    fn bootstrap_connection_mints_fallback_id() {
        let params = HandshakeParams {
            is_initial_connection: true,
            ..base()
        };
        let resolved = resolve(&params).unwrap();
        assert_eq!(resolved.role, ParticipantRole::Fallback);
        assert!(resolved.persistent_id.0.starts_with("F-"));
    }

    #[test]
    fn bare_reconnect_without_name_is_rejected() {
        let params = base();
        let err = resolve(&params).unwrap_err();
        assert!(matches!(err, SessionError::AuthFailed(_)));
    }

    #[test]
    fn transport_recovered_socket_is_accepted_without_a_name() {
        let params = HandshakeParams {
            recovered_by_transport: true,
            ..base()
        };
        assert!(resolve(&params).is_ok());
    }
}
