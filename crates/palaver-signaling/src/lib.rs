//! WebRTC signaling for Palaver.
//!
//! This crate turns the relay's signaling stream into peer-connection
//! calls and back:
//!
//! - **State** ([`NegotiationState`], [`SignalingState`], [`Role`],
//!   [`AttemptId`]) — where one attempt is in the offer/answer cycle.
//! - **Peer seam** ([`PeerConnection`], [`PeerFactory`],
//!   [`CandidateSink`]) — what the engine needs from a WebRTC stack.
//! - **Engine** ([`SignalingEngine`]) — the state machine: supersedes
//!   stale attempts, buffers early ICE candidates, and drops completions
//!   that belong to an attempt that is no longer current.
//!
//! With the `webrtc` feature, [`rtc::WebRtcPeerFactory`] provides a real
//! peer connection.

mod engine;
mod error;
mod negotiation;
mod peer;
mod worker;

#[cfg(feature = "webrtc")]
pub mod rtc;

pub use engine::SignalingEngine;
pub use error::{NegotiationError, PeerError, PeerOp};
pub use negotiation::{AttemptId, NegotiationState, Role, SignalingState};
pub use peer::{
    CandidateSink, PeerConnection, PeerEvent, PeerEventKind, PeerFactory,
};
