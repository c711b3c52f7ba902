//! Hub actor: the single owner of the connected-client table.
//!
//! Connection handlers never share the table. They send commands to the
//! hub task, which forwards each frame to every client except the one
//! it came from.

use std::collections::HashMap;
use std::sync::Arc;

use palaver_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::RelayError;

/// A frame on its way to a client. Shared, since one inbound frame fans
/// out to every other client unchanged.
pub type Frame = Arc<[u8]>;

/// Channel sender for delivering frames to one client's handler.
pub type ClientSender = mpsc::UnboundedSender<Frame>;

pub(crate) enum HubCommand {
    Join {
        id: ConnectionId,
        sender: ClientSender,
        reply: oneshot::Sender<Result<usize, RelayError>>,
    },
    Leave {
        id: ConnectionId,
    },
    Forward {
        from: ConnectionId,
        frame: Frame,
    },
    ClientCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the running hub. Cheap to clone.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Registers a client. Returns how many clients are connected now.
    pub async fn join(
        &self,
        id: ConnectionId,
        sender: ClientSender,
    ) -> Result<usize, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Join {
                id,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RelayError::HubUnavailable)?;
        reply_rx.await.map_err(|_| RelayError::HubUnavailable)?
    }

    /// Unregisters a client. Unknown ids are ignored.
    pub async fn leave(&self, id: ConnectionId) -> Result<(), RelayError> {
        self.sender
            .send(HubCommand::Leave { id })
            .await
            .map_err(|_| RelayError::HubUnavailable)
    }

    /// Sends `frame` to every client except `from` (fire-and-forget).
    pub async fn forward(
        &self,
        from: ConnectionId,
        frame: Frame,
    ) -> Result<(), RelayError> {
        self.sender
            .send(HubCommand::Forward { from, frame })
            .await
            .map_err(|_| RelayError::HubUnavailable)
    }

    pub async fn client_count(&self) -> Result<usize, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(HubCommand::ClientCount { reply: reply_tx })
            .await
            .map_err(|_| RelayError::HubUnavailable)?;
        reply_rx.await.map_err(|_| RelayError::HubUnavailable)
    }
}

struct Hub {
    clients: HashMap<ConnectionId, ClientSender>,
    receiver: mpsc::Receiver<HubCommand>,
}

impl Hub {
    async fn run(mut self) {
        tracing::debug!("relay hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Join { id, sender, reply } => {
                    let _ = reply.send(self.handle_join(id, sender));
                }
                HubCommand::Leave { id } => {
                    if self.clients.remove(&id).is_some() {
                        tracing::info!(%id, clients = self.clients.len(), "client left");
                    }
                }
                HubCommand::Forward { from, frame } => {
                    self.handle_forward(from, frame);
                }
                HubCommand::ClientCount { reply } => {
                    let _ = reply.send(self.clients.len());
                }
            }
        }

        tracing::debug!("relay hub stopped");
    }

    fn handle_join(
        &mut self,
        id: ConnectionId,
        sender: ClientSender,
    ) -> Result<usize, RelayError> {
        if self.clients.contains_key(&id) {
            return Err(RelayError::AlreadyJoined(id));
        }
        self.clients.insert(id, sender);
        tracing::info!(%id, clients = self.clients.len(), "client joined");
        Ok(self.clients.len())
    }

    fn handle_forward(&mut self, from: ConnectionId, frame: Frame) {
        let mut delivered = 0usize;
        // Drop clients whose handler has gone away.
        self.clients.retain(|id, sender| {
            if *id == from {
                return true;
            }
            if sender.send(Arc::clone(&frame)).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });
        tracing::debug!(%from, delivered, bytes = frame.len(), "forwarded frame");
    }
}

/// Spawns the hub task and returns a handle to it.
pub(crate) fn spawn_hub(capacity: usize) -> HubHandle {
    let (sender, receiver) = mpsc::channel(capacity);
    let hub = Hub {
        clients: HashMap::new(),
        receiver,
    };
    tokio::spawn(hub.run());
    HubHandle { sender }
}
