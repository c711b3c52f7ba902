//! Message router: decides where each inbound envelope goes.
//!
//! The router is pure. It looks at a decoded envelope (or the decode
//! failure) and returns a [`RouterAction`]; the client carries it out.
//! Chat payloads never reach the signaling engine and signal payloads
//! never reach the chat sink, because the two arms of the `match` are
//! the only way in.

use palaver_protocol::{ChatPayload, DecodeError, Envelope, SignalPayload};

/// What the client should do with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// Hand to the chat sink.
    DeliverChat(ChatPayload),
    /// Hand to the signaling engine.
    Signal(SignalPayload),
    /// Nothing to deliver; the frame was unusable.
    Drop(DecodeError),
}

/// Routing counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub chat: u64,
    pub signal: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub struct Router {
    stats: RouterStats,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Routes one decoded frame.
    pub fn route(&mut self, decoded: Result<Envelope, DecodeError>) -> RouterAction {
        match decoded {
            Ok(Envelope::Chat(payload)) => {
                self.stats.chat += 1;
                tracing::debug!(sender = %payload.sender, "routing chat");
                RouterAction::DeliverChat(payload)
            }
            Ok(Envelope::Signal(payload)) => {
                self.stats.signal += 1;
                tracing::debug!(kind = payload.label(), "routing signal");
                RouterAction::Signal(payload)
            }
            Err(error) => {
                self.stats.dropped += 1;
                tracing::warn!(%error, dropped = self.stats.dropped, "dropping undecodable frame");
                RouterAction::Drop(error)
            }
        }
    }
}
