//! Unified error type for the Palaver client.

use palaver_protocol::{DecodeError, ProtocolError};
use palaver_signaling::NegotiationError;
use palaver_transport::TransportError;

use crate::chat::ChatError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PalaverError {
    /// The relay connection failed or closed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An envelope could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A call attempt failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// A chat submission was rejected before sending.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// The client's event loop is no longer running.
    #[error("chat client is not running")]
    NotRunning,
}

impl From<DecodeError> for PalaverError {
    fn from(e: DecodeError) -> Self {
        Self::Protocol(ProtocolError::Decode(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let palaver_err: PalaverError = err.into();
        assert!(matches!(palaver_err, PalaverError::Transport(_)));
        assert!(palaver_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_decode_error_wraps_in_protocol() {
        let err = DecodeError::UnknownType(9);
        let palaver_err: PalaverError = err.into();
        assert!(matches!(
            palaver_err,
            PalaverError::Protocol(ProtocolError::Decode(DecodeError::UnknownType(9)))
        ));
    }

    #[test]
    fn test_from_negotiation_error() {
        let palaver_err: PalaverError = NegotiationError::Closed.into();
        assert!(matches!(palaver_err, PalaverError::Negotiation(_)));
    }

    #[test]
    fn test_from_chat_error() {
        let palaver_err: PalaverError = ChatError::EmptyMessage.into();
        assert!(matches!(palaver_err, PalaverError::Chat(_)));
    }
}
