//! Wire protocol for Palaver.
//!
//! One relay connection carries two unrelated message streams: chat
//! lines for display and WebRTC signaling for the peer connection. This
//! crate defines the envelope that keeps them apart:
//!
//! - **Types** ([`Envelope`], [`MessageKind`], [`ChatPayload`],
//!   [`SignalPayload`], [`IceCandidate`]) — what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how envelopes become
//!   frames and back.
//! - **Errors** ([`DecodeError`], [`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Router → Chat sink | Signaling engine
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{DecodeError, ProtocolError};
pub use types::{
    ChatPayload, Envelope, IceCandidate, MessageKind, SdpType,
    SessionDescription, SignalPayload,
};
