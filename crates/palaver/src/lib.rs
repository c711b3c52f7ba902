//! # Palaver
//!
//! A chat client that multiplexes chat and WebRTC signaling over one
//! relay connection.
//!
//! Chat lines and SDP/ICE signaling share a single WebSocket to a relay.
//! Palaver keeps them apart: chat goes to a [`ChatSink`], signaling
//! drives a [`SignalingEngine`] that negotiates one peer connection at a
//! time through a pluggable [`PeerFactory`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use palaver::prelude::*;
//!
//! // Implement PeerFactory for your WebRTC stack (or enable the `webrtc`
//! // feature), then:
//! // let client = ChatClient::builder()
//! //     .url("ws://localhost:8000/ws")
//! //     .connect(factory, StdoutSink)
//! //     .await?;
//! // let handle = client.handle();
//! // tokio::spawn(client.run());
//! // handle.send_chat("hi")?;
//! ```

pub mod chat;
mod client;
mod config;
mod error;
pub mod router;
pub mod telemetry;

pub use chat::{ChannelSink, ChatComposer, ChatError, ChatSink, DisplayLine, StdoutSink};
pub use client::{ChatClient, ChatClientBuilder, ClientEvent, ClientHandle};
pub use config::{ClientConfig, DEFAULT_RELAY_URL, guest_name};
pub use error::PalaverError;

pub use palaver_protocol as protocol;
pub use palaver_signaling as signaling;
pub use palaver_transport as transport;

pub use palaver_signaling::{
    AttemptId, NegotiationError, PeerConnection, PeerFactory, SignalingEngine,
    SignalingState,
};

pub mod prelude {
    pub use crate::{
        AttemptId, ChannelSink, ChatClient, ChatClientBuilder, ChatSink, ClientConfig,
        ClientEvent, ClientHandle, PalaverError, PeerConnection, PeerFactory,
        SignalingState, StdoutSink,
    };
    pub use palaver_protocol::{ChatPayload, Envelope, IceCandidate, SignalPayload};
}
