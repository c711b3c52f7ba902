//! Negotiation state: the record of one offer/answer attempt.
//!
//! A "negotiation" is everything the client knows about a single attempt
//! to bring up a peer connection:
//! - WHICH attempt it is (`AttemptId`)
//! - WHO started it (`Role`)
//! - WHERE in the offer/answer cycle it is (`SignalingState`)
//! - WHAT ICE candidates are waiting on a description in either direction

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use palaver_protocol::IceCandidate;

// ---------------------------------------------------------------------------
// AttemptId
// ---------------------------------------------------------------------------

/// Identifies one negotiation attempt.
///
/// Every completion a peer worker reports is tagged with the attempt it
/// belongs to, so results from a superseded attempt can be recognised
/// and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(u64);

static NEXT_ATTEMPT: AtomicU64 = AtomicU64::new(1);

impl AttemptId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a process-wide unique attempt id.
    pub fn next() -> Self {
        Self(NEXT_ATTEMPT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which side of the exchange this client is on for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Nothing has happened yet.
    Unset,
    /// This client created the offer.
    Caller,
    /// This client received the offer and answers it.
    Callee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "Unset"),
            Self::Caller => write!(f, "Caller"),
            Self::Callee => write!(f, "Callee"),
        }
    }
}

// ---------------------------------------------------------------------------
// SignalingState
// ---------------------------------------------------------------------------

/// Where an attempt is in the offer/answer cycle.
///
/// ```text
///   Idle ──(start_call)──→ HaveLocalOffer ──(remote answer)──→ Stable
///    │
///    └──(remote offer)──→ HaveRemoteOffer ──(answer sent)──→ Stable
///
///   any ──(peer op rejected)──→ Failed
///   any ──(hang up / transport closed / superseded)──→ Closed
/// ```
///
/// `Failed` and `Closed` are terminal: the attempt never leaves them.
/// A new call starts a fresh attempt instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Idle,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    Failed,
    Closed,
}

impl SignalingState {
    /// Returns `true` if the attempt can never make progress again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    /// Returns `true` once offer and answer have both been applied.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Stable)
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::HaveLocalOffer => write!(f, "HaveLocalOffer"),
            Self::HaveRemoteOffer => write!(f, "HaveRemoteOffer"),
            Self::Stable => write!(f, "Stable"),
            Self::Failed => write!(f, "Failed"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// NegotiationState
// ---------------------------------------------------------------------------

/// The state of one negotiation attempt.
///
/// This is plain data with no I/O. The engine drives it; the transition
/// helpers here only keep the fields consistent with each other:
///
/// - `pending_candidates` is empty whenever `remote_description_set`
///   is true
/// - `held_local_candidates` is empty whenever `local_description_set`
///   is true
/// - a terminal attempt holds no candidates at all
#[derive(Debug, Clone)]
pub struct NegotiationState {
    attempt: AttemptId,
    role: Role,
    state: SignalingState,
    local_description_set: bool,
    remote_description_set: bool,
    pending_candidates: Vec<IceCandidate>,
    /// Local candidates gathered before our own description went out.
    held_local_candidates: Vec<IceCandidate>,
    /// A remote description has been handed to the peer but the peer
    /// hasn't confirmed it yet.
    pub(crate) remote_in_flight: bool,
}

impl NegotiationState {
    /// Creates a fresh, idle attempt.
    pub fn new(attempt: AttemptId) -> Self {
        Self {
            attempt,
            role: Role::Unset,
            state: SignalingState::Idle,
            local_description_set: false,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            held_local_candidates: Vec::new(),
            remote_in_flight: false,
        }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SignalingState {
        self.state
    }

    pub fn local_description_set(&self) -> bool {
        self.local_description_set
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    /// Remote candidates received before the remote description.
    pub fn pending_candidates(&self) -> &[IceCandidate] {
        &self.pending_candidates
    }

    /// Returns `true` if nothing has happened on this attempt yet, so an
    /// incoming offer or a new call can reuse it.
    pub fn is_fresh(&self) -> bool {
        self.role == Role::Unset && self.state == SignalingState::Idle
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn set_state(&mut self, state: SignalingState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
    }

    /// Records that our description is applied and sent, and hands back
    /// the local candidates held until then, oldest first.
    pub(crate) fn mark_local_description_set(&mut self) -> Vec<IceCandidate> {
        self.local_description_set = true;
        std::mem::take(&mut self.held_local_candidates)
    }

    /// Accepts a locally gathered candidate.
    ///
    /// Returns `Some` if it can be sent now, `None` if it is held until
    /// our description has gone out (or dropped on a terminal attempt).
    pub(crate) fn accept_local_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Option<IceCandidate> {
        if self.state.is_terminal() {
            return None;
        }
        if self.local_description_set {
            return Some(candidate);
        }
        self.held_local_candidates.push(candidate);
        None
    }

    /// Records that the remote description is applied and hands back the
    /// buffered candidates, oldest first. The buffer is left empty so a
    /// second call returns nothing.
    pub(crate) fn mark_remote_description_set(&mut self) -> Vec<IceCandidate> {
        self.remote_description_set = true;
        self.remote_in_flight = false;
        std::mem::take(&mut self.pending_candidates)
    }

    /// Accepts a remote candidate.
    ///
    /// Returns `Some` if the candidate can be applied to the peer right
    /// now, `None` if it was buffered (or dropped on a terminal attempt).
    pub(crate) fn accept_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Option<IceCandidate> {
        if self.state.is_terminal() {
            return None;
        }
        if self.remote_description_set {
            return Some(candidate);
        }
        self.pending_candidates.push(candidate);
        None
    }

    /// Moves to `Failed`. Returns `false` if already terminal.
    pub(crate) fn fail(&mut self) -> bool {
        self.finish(SignalingState::Failed)
    }

    /// Moves to `Closed`. Returns `false` if already terminal.
    pub(crate) fn close(&mut self) -> bool {
        self.finish(SignalingState::Closed)
    }

    fn finish(&mut self, terminal: SignalingState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = terminal;
        self.remote_in_flight = false;
        self.pending_candidates.clear();
        self.held_local_candidates.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(n: u32) -> IceCandidate {
        IceCandidate::new(format!("candidate:{n}"))
    }

    #[test]
    fn test_attempt_id_next_is_unique() {
        let a = AttemptId::next();
        let b = AttemptId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_attempt_id_display() {
        assert_eq!(AttemptId::new(12).to_string(), "A-12");
    }

    #[test]
    fn test_new_state_is_fresh() {
        let state = NegotiationState::new(AttemptId::new(1));
        assert!(state.is_fresh());
        assert_eq!(state.state(), SignalingState::Idle);
        assert_eq!(state.role(), Role::Unset);
        assert!(!state.local_description_set());
        assert!(!state.remote_description_set());
    }

    #[test]
    fn test_accept_remote_candidate_buffers_until_remote_set() {
        let mut state = NegotiationState::new(AttemptId::new(1));
        assert_eq!(state.accept_remote_candidate(candidate(1)), None);
        assert_eq!(state.accept_remote_candidate(candidate(2)), None);
        assert_eq!(state.pending_candidates().len(), 2);

        let flushed = state.mark_remote_description_set();
        assert_eq!(flushed, vec![candidate(1), candidate(2)]);
        assert!(state.pending_candidates().is_empty());

        assert_eq!(
            state.accept_remote_candidate(candidate(3)),
            Some(candidate(3))
        );
    }

    #[test]
    fn test_mark_remote_description_set_twice_flushes_once() {
        let mut state = NegotiationState::new(AttemptId::new(1));
        state.accept_remote_candidate(candidate(1));
        assert_eq!(state.mark_remote_description_set().len(), 1);
        assert!(state.mark_remote_description_set().is_empty());
    }

    #[test]
    fn test_accept_local_candidate_holds_until_local_set() {
        let mut state = NegotiationState::new(AttemptId::new(1));
        assert_eq!(state.accept_local_candidate(candidate(1)), None);
        assert_eq!(state.mark_local_description_set(), vec![candidate(1)]);
        assert_eq!(
            state.accept_local_candidate(candidate(2)),
            Some(candidate(2))
        );
    }

    #[test]
    fn test_close_clears_pending_and_is_terminal() {
        let mut state = NegotiationState::new(AttemptId::new(1));
        state.accept_remote_candidate(candidate(1));
        assert!(state.close());
        assert_eq!(state.state(), SignalingState::Closed);
        assert!(state.pending_candidates().is_empty());
        assert!(!state.close());
        assert!(!state.fail());
        assert_eq!(state.state(), SignalingState::Closed);
    }

    #[test]
    fn test_terminal_state_ignores_transitions_and_candidates() {
        let mut state = NegotiationState::new(AttemptId::new(1));
        assert!(state.fail());
        state.set_state(SignalingState::Stable);
        assert_eq!(state.state(), SignalingState::Failed);
        assert_eq!(state.accept_remote_candidate(candidate(1)), None);
        assert!(state.pending_candidates().is_empty());
    }

    #[test]
    fn test_signaling_state_is_terminal() {
        assert!(SignalingState::Failed.is_terminal());
        assert!(SignalingState::Closed.is_terminal());
        assert!(!SignalingState::Idle.is_terminal());
        assert!(!SignalingState::Stable.is_terminal());
        assert!(SignalingState::Stable.is_connected());
    }
}
