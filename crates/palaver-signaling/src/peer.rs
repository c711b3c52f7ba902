//! The seam between the signaling engine and a WebRTC stack.
//!
//! The engine never talks to a WebRTC implementation directly. It asks a
//! [`PeerFactory`] for one [`PeerConnection`] per negotiation attempt and
//! drives it through the five operations below. Tests plug in a scripted
//! peer; production builds can enable the `webrtc` feature for a real one.

use std::future::Future;

use palaver_protocol::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

use crate::{AttemptId, NegotiationError, PeerError};

/// One WebRTC peer connection.
///
/// Every method may complete at any later time; the engine never awaits
/// them on its own task. Calls for one attempt are issued strictly one
/// after another, in the order the engine requested them.
pub trait PeerConnection: Send + Sync + 'static {
    /// Produces an SDP offer.
    fn create_offer(
        &self,
    ) -> impl Future<Output = Result<String, PeerError>> + Send;

    /// Produces an SDP answer to the applied remote offer.
    fn create_answer(
        &self,
    ) -> impl Future<Output = Result<String, PeerError>> + Send;

    fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;

    fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;

    fn add_ice_candidate(
        &self,
        candidate: IceCandidate,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Releases the connection. Called once when the attempt ends.
    fn close(&self) -> impl Future<Output = Result<(), PeerError>> + Send {
        async { Ok(()) }
    }
}

/// Creates a [`PeerConnection`] for a new negotiation attempt.
///
/// The factory hands the peer a [`CandidateSink`] so locally gathered ICE
/// candidates flow back into the engine tagged with the right attempt.
pub trait PeerFactory: Send + Sync + 'static {
    type Peer: PeerConnection;

    fn create(
        &self,
        attempt: AttemptId,
        candidates: CandidateSink,
    ) -> impl Future<Output = Result<Self::Peer, PeerError>> + Send;
}

// ---------------------------------------------------------------------------
// Peer events
// ---------------------------------------------------------------------------

/// Something that happened on a peer connection, reported back to the
/// engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEvent {
    pub attempt: AttemptId,
    pub kind: PeerEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerEventKind {
    /// A local description was created and applied; ready to send.
    LocalDescription(SessionDescription),
    /// The remote description was applied.
    RemoteDescriptionApplied(palaver_protocol::SdpType),
    /// A remote candidate was applied.
    CandidateApplied,
    /// The peer gathered a local candidate.
    LocalCandidate(IceCandidate),
    /// An operation failed. The attempt is over.
    Failed(NegotiationError),
}

/// Where a peer connection reports the ICE candidates it gathers.
///
/// Cheap to clone. Emitting after the engine is gone is a no-op.
#[derive(Debug, Clone)]
pub struct CandidateSink {
    attempt: AttemptId,
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl CandidateSink {
    pub(crate) fn new(
        attempt: AttemptId,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        Self { attempt, events }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Reports a locally gathered candidate. Returns `false` if the
    /// engine has shut down.
    pub fn emit(&self, candidate: IceCandidate) -> bool {
        self.events
            .send(PeerEvent {
                attempt: self.attempt,
                kind: PeerEventKind::LocalCandidate(candidate),
            })
            .is_ok()
    }
}
