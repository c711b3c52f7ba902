//! Peer worker: one Tokio task per negotiation attempt.
//!
//! The worker owns the attempt's [`PeerConnection`] and executes the
//! engine's requests strictly in arrival order, one at a time. Results
//! come back as [`PeerEvent`]s on the engine's event channel, each tagged
//! with the attempt, so the engine never blocks on the peer and never
//! confuses a late result with the current attempt.

use std::sync::Arc;

use palaver_protocol::{IceCandidate, SdpType, SessionDescription};
use tokio::sync::mpsc;

use crate::peer::{CandidateSink, PeerEvent, PeerEventKind};
use crate::{
    AttemptId, NegotiationError, PeerConnection, PeerError, PeerFactory,
    PeerOp,
};

/// Requests the engine can make of a peer worker.
#[derive(Debug)]
pub(crate) enum PeerCommand {
    /// Create an offer and apply it locally.
    Offer,
    /// Create an answer and apply it locally.
    Answer,
    /// Apply a remote description.
    ApplyRemote(SessionDescription),
    /// Apply a remote ICE candidate.
    AddCandidate(IceCandidate),
}

/// Handle to a running peer worker.
///
/// Dropping the handle ends the worker once its queue drains; the worker
/// then closes the peer connection.
pub(crate) struct WorkerHandle {
    attempt: AttemptId,
    sender: mpsc::UnboundedSender<PeerCommand>,
}

impl WorkerHandle {
    /// Queues a command behind everything already submitted.
    pub(crate) fn submit(&self, cmd: PeerCommand) -> Result<(), NegotiationError> {
        self.sender
            .send(cmd)
            .map_err(|_| NegotiationError::WorkerGone(self.attempt))
    }
}

/// The worker's internal state. Runs inside a Tokio task.
struct PeerWorker<P: PeerConnection> {
    attempt: AttemptId,
    peer: P,
    receiver: mpsc::UnboundedReceiver<PeerCommand>,
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl<P: PeerConnection> PeerWorker<P> {
    async fn run(mut self) {
        tracing::debug!(attempt = %self.attempt, "peer worker started");

        while let Some(cmd) = self.receiver.recv().await {
            match self.execute(cmd).await {
                Ok(kind) => self.report(kind),
                Err(e) => {
                    tracing::warn!(attempt = %self.attempt, error = %e, "peer operation failed");
                    self.report(PeerEventKind::Failed(e));
                    break;
                }
            }
        }

        if let Err(e) = self.peer.close().await {
            tracing::debug!(attempt = %self.attempt, error = %e, "peer close failed");
        }
        tracing::debug!(attempt = %self.attempt, "peer worker stopped");
    }

    async fn execute(
        &self,
        cmd: PeerCommand,
    ) -> Result<PeerEventKind, NegotiationError> {
        match cmd {
            PeerCommand::Offer => {
                let sdp = self
                    .peer
                    .create_offer()
                    .await
                    .map_err(rejected(PeerOp::CreateOffer))?;
                self.apply_local(SessionDescription::offer(sdp)).await
            }
            PeerCommand::Answer => {
                let sdp = self
                    .peer
                    .create_answer()
                    .await
                    .map_err(rejected(PeerOp::CreateAnswer))?;
                self.apply_local(SessionDescription::answer(sdp)).await
            }
            PeerCommand::ApplyRemote(description) => {
                let sdp_type: SdpType = description.sdp_type;
                self.peer
                    .set_remote_description(description)
                    .await
                    .map_err(rejected(PeerOp::SetRemoteDescription))?;
                Ok(PeerEventKind::RemoteDescriptionApplied(sdp_type))
            }
            PeerCommand::AddCandidate(candidate) => {
                self.peer
                    .add_ice_candidate(candidate)
                    .await
                    .map_err(rejected(PeerOp::AddIceCandidate))?;
                Ok(PeerEventKind::CandidateApplied)
            }
        }
    }

    async fn apply_local(
        &self,
        description: SessionDescription,
    ) -> Result<PeerEventKind, NegotiationError> {
        self.peer
            .set_local_description(description.clone())
            .await
            .map_err(rejected(PeerOp::SetLocalDescription))?;
        Ok(PeerEventKind::LocalDescription(description))
    }

    /// Posts an event to the engine. Silently drops if the engine is gone.
    fn report(&self, kind: PeerEventKind) {
        let _ = self.events.send(PeerEvent {
            attempt: self.attempt,
            kind,
        });
    }
}

fn rejected(op: PeerOp) -> impl FnOnce(PeerError) -> NegotiationError {
    move |source| NegotiationError::Rejected { op, source }
}

/// Spawns a worker for `attempt` and returns a handle to it.
///
/// The peer connection is created on the worker task. Commands submitted
/// before creation finishes wait in the queue; if creation fails the
/// engine receives a `Failed` event and the queue is discarded.
pub(crate) fn spawn_worker<F: PeerFactory>(
    attempt: AttemptId,
    factory: Arc<F>,
    events: mpsc::UnboundedSender<PeerEvent>,
) -> WorkerHandle {
    let (sender, receiver) = mpsc::unbounded_channel();
    let sink = CandidateSink::new(attempt, events.clone());

    tokio::spawn(async move {
        let peer = match factory.create(attempt, sink).await {
            Ok(peer) => peer,
            Err(source) => {
                tracing::warn!(%attempt, error = %source, "peer connection creation failed");
                let _ = events.send(PeerEvent {
                    attempt,
                    kind: PeerEventKind::Failed(NegotiationError::Rejected {
                        op: PeerOp::Create,
                        source,
                    }),
                });
                return;
            }
        };

        PeerWorker {
            attempt,
            peer,
            receiver,
            events,
        }
        .run()
        .await;
    });

    WorkerHandle { attempt, sender }
}
