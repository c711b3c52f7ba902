//! Error types for the relay.

use palaver_transport::{ConnectionId, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Binding, accepting, or talking to a client failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The hub's command channel is closed.
    #[error("relay hub is unavailable")]
    HubUnavailable,

    /// A client id was registered twice.
    #[error("client {0} already joined")]
    AlreadyJoined(ConnectionId),
}
