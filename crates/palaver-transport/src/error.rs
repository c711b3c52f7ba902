/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening a connection to the relay failed.
    #[error("connect to {url} failed: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Returns `true` if this error means the peer is gone for good.
    ///
    /// Callers use this to decide between "log and continue" and
    /// "tear the session down".
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed(_) | Self::ReceiveFailed(_) | Self::Shutdown
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_closed_for_terminal_errors() {
        assert!(TransportError::ConnectionClosed("bye".into()).is_closed());
        assert!(TransportError::Shutdown.is_closed());
        assert!(
            TransportError::ReceiveFailed(std::io::Error::other("reset"))
                .is_closed()
        );
    }

    #[test]
    fn test_is_closed_false_for_send_failure() {
        let err = TransportError::SendFailed(std::io::Error::other("full"));
        assert!(!err.is_closed());
    }

    #[test]
    fn test_connect_failed_display_includes_url() {
        let err = TransportError::ConnectFailed {
            url: "ws://localhost:1/ws".into(),
            source: std::io::Error::other("refused"),
        };
        let text = err.to_string();
        assert!(text.contains("ws://localhost:1/ws"));
        assert!(text.contains("refused"));
    }
}
