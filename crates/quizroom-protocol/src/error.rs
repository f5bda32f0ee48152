//! Error types for the protocol layer.
//!
//! Each crate in this workspace defines its own error enum so a
//! `ProtocolError` always means a problem in serialization/deserialization,
//! never in session, room, or transport logic.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, wrong data
    /// types, or an unrecognized event `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but is invalid at the protocol level — e.g. a
    /// payload whose serialized size exceeds the 5 MB per-event cap.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
