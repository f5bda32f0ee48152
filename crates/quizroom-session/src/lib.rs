//! Participant identity and connection-session management for the quiz
//! room server.
//!
//! This crate handles two related but distinct concerns:
//!
//! 1. **Identity resolution** — turning handshake parameters into a
//!    `(PersistentId, role, displayName)` triple ([`identity::resolve`]).
//! 2. **Session tracking** — knowing who's connected, who's in their
//!    disconnect grace period, and whose grace period has elapsed
//!    ([`SessionManager`]).
//!
//! There is no end-user authentication here: identities are self-asserted
//! by the handshake and trusted, per spec §1's non-goals.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← uses sessions to know which participants are active
//!     ↕
//! Session Layer (this crate)  ← resolves identity, tracks connection state
//!     ↕
//! Protocol Layer (below)  ← provides PersistentId, ConnectionId types
//! ```

mod error;
mod identity;
mod manager;
mod session;

pub use error::SessionError;
pub use identity::{resolve, HandshakeParams, ParticipantRole, ResolvedIdentity};
pub use manager::SessionManager;
pub use session::{grace_period_for, Session, SessionState, GM_GRACE, PLAYER_GRACE};
