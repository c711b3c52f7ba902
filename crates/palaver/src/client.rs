//! `ChatClient` builder and event loop.
//!
//! This is the entry point for running a Palaver client. It ties
//! together all the layers: transport → codec → router → chat sink |
//! signaling engine.
//!
//! Everything that used to be ambient state (the socket, the peer
//! connection, the pending candidates) lives in one [`ChatClient`] value
//! owned by one task. Other tasks talk to it through a cloneable
//! [`ClientHandle`] and listen to it through [`ClientEvent`]s.

use std::time::Duration;

use palaver_protocol::{ChatPayload, Codec, Envelope, JsonCodec};
use palaver_signaling::{
    AttemptId, NegotiationError, PeerFactory, SignalingEngine, SignalingState,
};
use palaver_transport::{ClientConnection, Connection, TransportError};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::chat::{ChatComposer, ChatSink, local_time};
use crate::router::{Router, RouterAction, RouterStats};
use crate::{ClientConfig, PalaverError};

const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Events and commands
// ---------------------------------------------------------------------------

/// Things the client reports to whoever is watching.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The current call attempt changed state.
    CallState {
        attempt: AttemptId,
        state: SignalingState,
    },
    /// A call attempt failed. Chat is unaffected.
    NegotiationFailed(NegotiationError),
    /// The relay connection is gone and the loop has stopped.
    Disconnected,
}

enum ClientCommand {
    SendChat(ChatPayload),
    StartCall(oneshot::Sender<Result<AttemptId, NegotiationError>>),
    HangUp,
    Shutdown,
}

/// Handle to a running [`ChatClient`]. Cheap to clone.
#[derive(Clone)]
pub struct ClientHandle {
    composer: ChatComposer,
    commands: mpsc::UnboundedSender<ClientCommand>,
}

impl ClientHandle {
    /// Sends a chat line. Returns the payload as it will go on the wire.
    ///
    /// # Errors
    /// - [`PalaverError::Chat`] if `text` is blank (nothing is sent)
    /// - [`PalaverError::NotRunning`] if the client loop has stopped
    pub fn send_chat(&self, text: &str) -> Result<ChatPayload, PalaverError> {
        let payload = self.composer.compose(text)?;
        self.commands
            .send(ClientCommand::SendChat(payload.clone()))
            .map_err(|_| PalaverError::NotRunning)?;
        Ok(payload)
    }

    /// Starts a call as the offering side.
    pub async fn start_call(&self) -> Result<AttemptId, PalaverError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(ClientCommand::StartCall(reply_tx))
            .map_err(|_| PalaverError::NotRunning)?;
        let attempt = reply_rx.await.map_err(|_| PalaverError::NotRunning)??;
        Ok(attempt)
    }

    /// Ends the current call attempt. The relay connection stays up.
    pub fn hang_up(&self) -> Result<(), PalaverError> {
        self.commands
            .send(ClientCommand::HangUp)
            .map_err(|_| PalaverError::NotRunning)
    }

    /// Flushes queued messages, closes the relay connection, and stops
    /// the loop.
    pub fn shutdown(&self) -> Result<(), PalaverError> {
        self.commands
            .send(ClientCommand::Shutdown)
            .map_err(|_| PalaverError::NotRunning)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and connecting a [`ChatClient`].
///
/// # Example
///
/// ```rust,ignore
/// use palaver::prelude::*;
///
/// let client = ChatClient::builder()
///     .url("ws://localhost:8000/ws")
///     .sender("alice")
///     .connect(my_peer_factory, StdoutSink)
///     .await?;
/// let handle = client.handle();
/// tokio::spawn(client.run());
/// handle.send_chat("hi")?;
/// ```
pub struct ChatClientBuilder {
    config: ClientConfig,
}

impl ChatClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the relay WebSocket URL.
    pub fn url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    /// Sets the name sent with every chat line.
    pub fn sender(mut self, sender: &str) -> Self {
        self.config.sender = sender.to_string();
        self
    }

    /// Sets the label used when echoing our own lines.
    pub fn local_label(mut self, label: &str) -> Self {
        self.config.local_label = label.to_string();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Connects to the relay.
    ///
    /// # Errors
    /// Returns [`PalaverError::Transport`] if the relay refuses the
    /// connection or doesn't answer within the connect timeout.
    pub async fn connect<F, S>(
        self,
        factory: F,
        sink: S,
    ) -> Result<ChatClient<F, S>, PalaverError>
    where
        F: PeerFactory,
        S: ChatSink,
    {
        let url = self.config.url.clone();
        let conn = tokio::time::timeout(
            self.config.connect_timeout,
            ClientConnection::connect(&url),
        )
        .await
        .map_err(|_| TransportError::ConnectFailed {
            url: url.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "relay did not answer in time",
            ),
        })??;

        Ok(ChatClient::new(conn, self.config, factory, sink))
    }
}

impl Default for ChatClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// A connected chat client.
///
/// Call [`run()`](Self::run) to drive it; use [`handle()`](Self::handle)
/// and [`subscribe()`](Self::subscribe) first to talk to it while it
/// runs.
pub struct ChatClient<F: PeerFactory, S: ChatSink> {
    conn: ClientConnection,
    codec: JsonCodec,
    router: Router,
    engine: SignalingEngine<F>,
    sink: S,
    config: ClientConfig,
    composer: ChatComposer,
    outbound_tx: mpsc::UnboundedSender<Envelope>,
    outbound_rx: mpsc::UnboundedReceiver<Envelope>,
    commands_tx: mpsc::UnboundedSender<ClientCommand>,
    commands_rx: mpsc::UnboundedReceiver<ClientCommand>,
    events: broadcast::Sender<ClientEvent>,
    last_state: (AttemptId, SignalingState),
}

impl<F: PeerFactory, S: ChatSink> ChatClient<F, S> {
    /// Creates a new builder.
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::new()
    }

    fn new(conn: ClientConnection, config: ClientConfig, factory: F, sink: S) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let engine = SignalingEngine::new(factory, outbound_tx.clone());
        let last_state = (engine.negotiation().attempt(), engine.state());

        Self {
            conn,
            codec: JsonCodec,
            router: Router::new(),
            engine,
            sink,
            composer: ChatComposer::new(config.sender.clone()),
            config,
            outbound_tx,
            outbound_rx,
            commands_tx,
            commands_rx,
            events,
            last_state,
        }
    }

    /// Returns a handle for sending commands to the running client.
    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            composer: self.composer.clone(),
            commands: self.commands_tx.clone(),
        }
    }

    /// Subscribes to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn engine(&self) -> &SignalingEngine<F> {
        &self.engine
    }

    pub fn router_stats(&self) -> RouterStats {
        self.router.stats()
    }

    /// Runs the client until the relay connection closes or
    /// [`ClientHandle::shutdown`] is called.
    ///
    /// # Errors
    /// Returns the transport error if the connection fails. A clean close
    /// by either side returns `Ok(())`.
    pub async fn run(mut self) -> Result<(), PalaverError> {
        tracing::info!(url = %self.config.url, sender = %self.config.sender, "chat client running");

        loop {
            tokio::select! {
                frame = self.conn.recv() => match frame {
                    Ok(Some(data)) => self.on_frame(&data),
                    Ok(None) => {
                        tracing::info!("relay closed the connection");
                        self.teardown();
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "relay connection failed");
                        self.teardown();
                        return Err(e.into());
                    }
                },
                Some(envelope) = self.outbound_rx.recv() => {
                    if let Err(e) = self.transmit(envelope).await {
                        self.teardown();
                        return Err(e);
                    }
                }
                Some(event) = self.engine.next_event() => {
                    let result = self.engine.handle_event(event);
                    self.after_engine(result);
                }
                cmd = self.commands_rx.recv() => match cmd {
                    Some(ClientCommand::SendChat(payload)) => {
                        tracing::debug!(len = payload.message.len(), "queueing chat");
                        let _ = self.outbound_tx.send(Envelope::Chat(payload));
                    }
                    Some(ClientCommand::StartCall(reply)) => {
                        let result = self.engine.start_call();
                        if let Err(e) = &result {
                            tracing::warn!(error = %e, "could not start call");
                        }
                        self.publish_state();
                        let _ = reply.send(result);
                    }
                    Some(ClientCommand::HangUp) => {
                        self.engine.hang_up();
                        self.publish_state();
                    }
                    Some(ClientCommand::Shutdown) | None => {
                        let flushed = self.flush().await;
                        if let Err(e) = self.conn.close().await {
                            tracing::debug!(error = %e, "close handshake failed");
                        }
                        self.teardown();
                        tracing::info!("chat client stopped");
                        return flushed;
                    }
                },
            }
        }
    }

    fn on_frame(&mut self, data: &[u8]) {
        let decoded = self.codec.decode(data);
        match self.router.route(decoded) {
            RouterAction::DeliverChat(payload) => {
                self.sink
                    .display(&payload.sender, &payload.message, &payload.timestamp);
            }
            RouterAction::Signal(payload) => {
                let result = self.engine.on_remote_signal(payload);
                self.after_engine(result);
            }
            RouterAction::Drop(_) => {}
        }
    }

    /// Encodes and sends one envelope. Chat lines are echoed locally once
    /// they are on the wire.
    async fn transmit(&mut self, envelope: Envelope) -> Result<(), PalaverError> {
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        if let Envelope::Chat(payload) = &envelope {
            self.sink
                .display(&self.config.local_label, &payload.message, &local_time());
        }
        Ok(())
    }

    /// Sends whatever is still queued.
    async fn flush(&mut self) -> Result<(), PalaverError> {
        while let Ok(envelope) = self.outbound_rx.try_recv() {
            self.transmit(envelope).await?;
        }
        Ok(())
    }

    fn after_engine(&mut self, result: Result<(), NegotiationError>) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "call attempt failed");
            let _ = self.events.send(ClientEvent::NegotiationFailed(e));
        }
        self.publish_state();
    }

    fn publish_state(&mut self) {
        let now = (self.engine.negotiation().attempt(), self.engine.state());
        if now == self.last_state {
            return;
        }
        self.last_state = now;
        let (attempt, state) = now;
        tracing::info!(%attempt, %state, "call state changed");
        let _ = self.events.send(ClientEvent::CallState { attempt, state });
    }

    fn teardown(&mut self) {
        self.engine.close();
        self.publish_state();
        let _ = self.events.send(ClientEvent::Disconnected);
    }
}
