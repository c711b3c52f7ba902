//! Error types for the protocol layer.
//!
//! Decoding failures get their own type, [`DecodeError`], because the
//! router needs to tell "this was garbage" apart from "this was a
//! well-formed envelope of a kind we don't know". Both are recovered
//! locally (drop + diagnostic) and never reach the signaling engine.

/// Why an inbound frame could not be turned into an [`Envelope`](crate::Envelope).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The bytes are not a well-formed document, or the payload does not
    /// have the shape its `type` requires.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// The document is well-formed but `type` is outside `{0, 1}`.
    #[error("unknown message type: {0}")]
    UnknownType(i64),
}

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an envelope into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
