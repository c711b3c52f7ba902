//! `RelayServer` builder and accept loop.
//!
//! The relay accepts WebSocket clients and passes every well-formed
//! envelope from one client to all the others. It never looks inside the
//! payload: chat and signaling are just frames to it.

use std::sync::Arc;

use palaver_protocol::{Codec, JsonCodec};
use palaver_transport::{Connection, ServerConnection, Transport, WebSocketTransport};
use tokio::sync::mpsc;

use crate::hub::{HubHandle, spawn_hub};
use crate::{RelayConfig, RelayError};

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), palaver_relay::RelayError> {
/// use palaver_relay::RelayServer;
///
/// let server = RelayServer::builder().bind("0.0.0.0:8000").build().await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the relay to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and starts the hub.
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let hub = spawn_hub(self.config.hub_capacity);
        Ok(RelayServer {
            transport,
            hub,
            codec: Arc::new(JsonCodec),
        })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay. Call [`run()`](Self::run) to start accepting clients.
pub struct RelayServer {
    transport: WebSocketTransport,
    hub: HubHandle,
    codec: Arc<JsonCodec>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the relay is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the hub, e.g. to watch the client count.
    pub fn hub(&self) -> HubHandle {
        self.hub.clone()
    }

    /// Runs the accept loop. Each client gets its own handler task.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(addr = ?self.local_addr().ok(), "palaver relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let hub = self.hub.clone();
                    let codec = Arc::clone(&self.codec);
                    tokio::spawn(async move {
                        let conn_id = conn.id();
                        if let Err(e) = handle_connection(conn, hub, codec).await {
                            tracing::debug!(%conn_id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Handles a single client from join to leave.
async fn handle_connection(
    conn: ServerConnection,
    hub: HubHandle,
    codec: Arc<JsonCodec>,
) -> Result<(), RelayError> {
    let conn_id = conn.id();
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.join(conn_id, tx).await?;

    let result = loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(data)) => match codec.decode(&data) {
                    Ok(envelope) => {
                        tracing::debug!(%conn_id, kind = %envelope.kind(), "relaying envelope");
                        if let Err(e) = hub.forward(conn_id, data.into()).await {
                            break Err(e);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%conn_id, %error, "dropping malformed frame");
                    }
                },
                Ok(None) => {
                    tracing::debug!(%conn_id, "client closed connection");
                    break Ok(());
                }
                Err(e) => break Err(e.into()),
            },
            Some(frame) = rx.recv() => {
                if let Err(e) = conn.send(&frame).await {
                    break Err(e.into());
                }
            }
        }
    };

    let _ = hub.leave(conn_id).await;
    result
}
