//! The signaling engine: drives offer/answer/ICE negotiation.
//!
//! The engine is owned by a single task (the chat client's event loop)
//! and is not thread-safe by itself. It never awaits a peer operation on
//! that task. Peer work is queued on a per-attempt worker
//! ([`crate::worker`]) and the results come back through
//! [`SignalingEngine::next_event`], to be fed into
//! [`SignalingEngine::handle_event`].
//!
//! ## Attempt lifecycle
//!
//! ```text
//! start_call() / remote offer ──→ fresh attempt (old one → Closed)
//!        │
//!        ▼
//!   worker queue: Offer | ApplyRemote → AddCandidate* → Answer
//!        │
//!        ▼
//!   PeerEvent { attempt, .. } ──→ handle_event() ──→ outbound signal
//!                                     │
//!                                     └── stale attempt? dropped
//! ```

use std::sync::Arc;

use palaver_protocol::{
    Envelope, IceCandidate, SdpType, SessionDescription, SignalPayload,
};
use tokio::sync::mpsc;

use crate::peer::{PeerEvent, PeerEventKind};
use crate::worker::{PeerCommand, WorkerHandle, spawn_worker};
use crate::{
    AttemptId, NegotiationError, NegotiationState, PeerFactory, Role,
    SignalingState,
};

/// Negotiates a single peer connection over the relay's signaling stream.
///
/// Outgoing signals are written as [`Envelope::Signal`] to the `outbound`
/// channel handed to [`SignalingEngine::new`], which the client shares
/// with its chat composer so the two streams stay in send order.
pub struct SignalingEngine<F: PeerFactory> {
    factory: Arc<F>,
    current: NegotiationState,
    /// The attempt most recently superseded or replaced, for inspection.
    previous: Option<NegotiationState>,
    worker: Option<WorkerHandle>,
    outbound: mpsc::UnboundedSender<Envelope>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    events_rx: mpsc::UnboundedReceiver<PeerEvent>,
    /// Set once the relay connection is gone. Nothing is sent after this.
    closed: bool,
}

impl<F: PeerFactory> SignalingEngine<F> {
    pub fn new(factory: F, outbound: mpsc::UnboundedSender<Envelope>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            factory: Arc::new(factory),
            current: NegotiationState::new(AttemptId::next()),
            previous: None,
            worker: None,
            outbound,
            events_tx,
            events_rx,
            closed: false,
        }
    }

    /// The current attempt.
    pub fn negotiation(&self) -> &NegotiationState {
        &self.current
    }

    /// The attempt replaced by the current one, if any.
    pub fn previous(&self) -> Option<&NegotiationState> {
        self.previous.as_ref()
    }

    pub fn state(&self) -> SignalingState {
        self.current.state()
    }

    pub fn is_connected(&self) -> bool {
        self.current.state().is_connected()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Starts a call as the offering side.
    ///
    /// If an attempt is already under way it is closed and a fresh one
    /// begins. Returns the new attempt's id; the offer itself goes out once
    /// the peer has produced and applied it.
    ///
    /// # Errors
    /// Returns [`NegotiationError::Closed`] after the relay connection is
    /// gone.
    pub fn start_call(&mut self) -> Result<AttemptId, NegotiationError> {
        if self.closed {
            return Err(NegotiationError::Closed);
        }
        self.begin_attempt("local call");
        self.current.set_role(Role::Caller);
        let attempt = self.current.attempt();
        tracing::info!(%attempt, "starting call");
        self.submit(PeerCommand::Offer)?;
        Ok(attempt)
    }

    /// Handles a signal that arrived from the remote peer via the relay.
    ///
    /// - an offer starts (or restarts) an attempt as the answering side
    /// - an answer completes our offer; an unexpected one is ignored
    /// - a candidate is applied, or buffered until the remote description
    ///   is in place
    ///
    /// Signals arriving after [`close`](Self::close) are ignored.
    pub fn on_remote_signal(
        &mut self,
        payload: SignalPayload,
    ) -> Result<(), NegotiationError> {
        if self.closed {
            tracing::debug!(kind = payload.label(), "signal after close, ignoring");
            return Ok(());
        }
        match payload {
            SignalPayload::Offer { sdp } => self.on_remote_offer(sdp),
            SignalPayload::Answer { sdp } => self.on_remote_answer(sdp),
            SignalPayload::IceCandidate(candidate) => {
                self.on_remote_candidate(candidate)
            }
        }
    }

    /// Sends a locally gathered ICE candidate for the current attempt.
    ///
    /// Candidates gathered before our own description has gone out are
    /// held and sent right after it.
    pub fn on_local_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        match self.current.accept_local_candidate(candidate) {
            Some(candidate) => self.send(candidate.into()),
            None => Ok(()),
        }
    }

    /// Ends the current attempt without touching the relay connection.
    /// A later [`start_call`](Self::start_call) or remote offer begins a
    /// fresh one.
    pub fn hang_up(&mut self) {
        if self.current.is_fresh() {
            return;
        }
        if self.current.close() {
            tracing::info!(attempt = %self.current.attempt(), "call hung up");
        }
        self.worker = None;
    }

    /// Closes the engine for good: the relay connection is gone.
    ///
    /// The current attempt moves to `Closed`, its peer is released, and
    /// no further signal is ever sent. Calling this twice is harmless.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.current.close();
        self.worker = None;
        tracing::info!(attempt = %self.current.attempt(), "signaling closed");
    }

    // -----------------------------------------------------------------------
    // Peer events
    // -----------------------------------------------------------------------

    /// Waits for the next peer completion or local candidate.
    ///
    /// Cancel safe, so it can sit in a `tokio::select!` arm.
    pub async fn next_event(&mut self) -> Option<PeerEvent> {
        self.events_rx.recv().await
    }

    /// Applies a peer event to the current attempt.
    ///
    /// Events from any other attempt are stale and dropped, as are events
    /// for an attempt that already ended.
    ///
    /// # Errors
    /// Returns the [`NegotiationError`] that failed the attempt, if this
    /// event reports one. The engine stays usable.
    pub fn handle_event(&mut self, event: PeerEvent) -> Result<(), NegotiationError> {
        if event.attempt != self.current.attempt() {
            tracing::debug!(
                attempt = %event.attempt,
                current = %self.current.attempt(),
                "discarding stale peer event"
            );
            return Ok(());
        }
        if self.current.state().is_terminal() {
            tracing::debug!(
                attempt = %event.attempt,
                state = %self.current.state(),
                "discarding peer event for finished attempt"
            );
            return Ok(());
        }

        match event.kind {
            PeerEventKind::LocalDescription(description) => {
                self.on_local_description(description)
            }
            PeerEventKind::RemoteDescriptionApplied(sdp_type) => {
                self.on_remote_description_applied(sdp_type)
            }
            PeerEventKind::CandidateApplied => {
                tracing::trace!(attempt = %event.attempt, "remote candidate applied");
                Ok(())
            }
            PeerEventKind::LocalCandidate(candidate) => {
                self.on_local_candidate(candidate)
            }
            PeerEventKind::Failed(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn on_remote_offer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        self.begin_attempt("remote offer");
        self.current.set_role(Role::Callee);
        self.current.remote_in_flight = true;
        tracing::info!(attempt = %self.current.attempt(), "received offer");
        self.submit(PeerCommand::ApplyRemote(SessionDescription::offer(sdp)))
    }

    fn on_remote_answer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        let expected = self.current.role() == Role::Caller
            && self.current.state() == SignalingState::HaveLocalOffer
            && !self.current.remote_description_set()
            && !self.current.remote_in_flight;
        if !expected {
            tracing::warn!(
                attempt = %self.current.attempt(),
                state = %self.current.state(),
                "ignoring unexpected answer"
            );
            return Ok(());
        }
        self.current.remote_in_flight = true;
        tracing::info!(attempt = %self.current.attempt(), "received answer");
        self.submit(PeerCommand::ApplyRemote(SessionDescription::answer(sdp)))
    }

    fn on_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        match self.current.accept_remote_candidate(candidate) {
            Some(candidate) => self.submit(PeerCommand::AddCandidate(candidate)),
            None if self.current.state().is_terminal() => {
                tracing::debug!(
                    attempt = %self.current.attempt(),
                    "dropping candidate for finished attempt"
                );
                Ok(())
            }
            None => {
                tracing::debug!(
                    attempt = %self.current.attempt(),
                    state = %self.current.state(),
                    buffered = self.current.pending_candidates().len(),
                    "remote candidate held"
                );
                Ok(())
            }
        }
    }

    fn on_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let held = self.current.mark_local_description_set();
        match description.sdp_type {
            SdpType::Offer => self.current.set_state(SignalingState::HaveLocalOffer),
            SdpType::Answer => self.current.set_state(SignalingState::Stable),
        }
        tracing::info!(
            attempt = %self.current.attempt(),
            sdp_type = %description.sdp_type,
            state = %self.current.state(),
            "sending local description"
        );
        self.send(description.into())?;
        for candidate in held {
            self.send(candidate.into())?;
        }
        Ok(())
    }

    fn on_remote_description_applied(
        &mut self,
        sdp_type: SdpType,
    ) -> Result<(), NegotiationError> {
        let pending = self.current.mark_remote_description_set();
        match sdp_type {
            SdpType::Offer => self.current.set_state(SignalingState::HaveRemoteOffer),
            SdpType::Answer => self.current.set_state(SignalingState::Stable),
        }
        tracing::debug!(
            attempt = %self.current.attempt(),
            %sdp_type,
            flushed = pending.len(),
            "remote description applied"
        );
        for candidate in pending {
            self.submit(PeerCommand::AddCandidate(candidate))?;
        }
        if sdp_type == SdpType::Offer {
            self.submit(PeerCommand::Answer)?;
        }
        Ok(())
    }

    /// Makes sure the current attempt is fresh, closing it if it isn't.
    fn begin_attempt(&mut self, reason: &'static str) {
        if self.current.is_fresh() {
            return;
        }
        let mut old = std::mem::replace(
            &mut self.current,
            NegotiationState::new(AttemptId::next()),
        );
        if old.close() {
            tracing::info!(
                attempt = %old.attempt(),
                next = %self.current.attempt(),
                reason,
                "superseding active attempt"
            );
        }
        self.worker = None;
        self.previous = Some(old);
    }

    /// Queues a command on the current attempt's worker, starting the
    /// worker if needed. A dead worker fails the attempt.
    fn submit(&mut self, cmd: PeerCommand) -> Result<(), NegotiationError> {
        let attempt = self.current.attempt();
        let factory = Arc::clone(&self.factory);
        let events = self.events_tx.clone();
        let worker = self
            .worker
            .get_or_insert_with(|| spawn_worker(attempt, factory, events));
        if let Err(e) = worker.submit(cmd) {
            self.fail(&e);
            return Err(e);
        }
        Ok(())
    }

    fn fail(&mut self, error: &NegotiationError) {
        if self.current.fail() {
            tracing::warn!(
                attempt = %self.current.attempt(),
                %error,
                "negotiation failed"
            );
        }
        self.worker = None;
    }

    fn send(&mut self, payload: SignalPayload) -> Result<(), NegotiationError> {
        if self.closed {
            return Err(NegotiationError::Closed);
        }
        tracing::debug!(attempt = %self.current.attempt(), kind = payload.label(), "sending signal");
        if self.outbound.send(Envelope::Signal(payload)).is_err() {
            tracing::warn!("outbound channel closed, shutting signaling down");
            self.close();
            return Err(NegotiationError::Closed);
        }
        Ok(())
    }
}
