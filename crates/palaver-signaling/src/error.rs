//! Error types for the signaling layer.

use std::fmt;

/// The peer-connection operation that was running when something failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerOp {
    Create,
    CreateOffer,
    CreateAnswer,
    SetLocalDescription,
    SetRemoteDescription,
    AddIceCandidate,
}

impl fmt::Display for PeerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::CreateOffer => "createOffer",
            Self::CreateAnswer => "createAnswer",
            Self::SetLocalDescription => "setLocalDescription",
            Self::SetRemoteDescription => "setRemoteDescription",
            Self::AddIceCandidate => "addIceCandidate",
        };
        f.write_str(name)
    }
}

/// An error reported by a [`PeerConnection`](crate::PeerConnection)
/// implementation. Carries only the stack's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PeerError(String);

impl PeerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Errors surfaced by the [`SignalingEngine`](crate::SignalingEngine).
///
/// A `NegotiationError` ends the current attempt (it moves to `Failed`)
/// but never the process: a new call may be started right away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    /// The peer connection rejected a description or candidate.
    #[error("{op} failed: {source}")]
    Rejected {
        op: PeerOp,
        #[source]
        source: PeerError,
    },

    /// The attempt's peer worker is gone (it already failed or was
    /// shut down).
    #[error("peer connection for attempt {0} is no longer running")]
    WorkerGone(crate::AttemptId),

    /// The relay connection is closed; no more signaling can be sent.
    #[error("signaling channel closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display_names_the_operation() {
        let err = NegotiationError::Rejected {
            op: PeerOp::SetRemoteDescription,
            source: PeerError::new("bad sdp"),
        };
        assert_eq!(err.to_string(), "setRemoteDescription failed: bad sdp");
    }

    #[test]
    fn test_worker_gone_display_includes_attempt() {
        let err = NegotiationError::WorkerGone(crate::AttemptId::new(3));
        assert!(err.to_string().contains("A-3"));
    }
}
