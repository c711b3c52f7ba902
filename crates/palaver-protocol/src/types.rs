//! Wire types shared by the chat client, the signaling engine, and the
//! relay.
//!
//! Every frame on the relay connection is an [`Envelope`]:
//!
//! ```text
//! { "type": 0 | 1, "payload": <ChatPayload | SignalPayload> }
//! ```
//!
//! `type = 0` is chat, `type = 1` is WebRTC signaling. The payload shape
//! is determined solely by `type`.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The closed set of envelope kinds.
///
/// On the wire this is a bare integer, not a string, so serde's derive is
/// replaced by a hand-written `Serialize` that emits [`MessageKind::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A chat line for display.
    Chat,
    /// A WebRTC negotiation message.
    Signal,
}

impl MessageKind {
    /// The integer used for this kind on the wire.
    pub const fn code(self) -> u8 {
        match self {
            Self::Chat => 0,
            Self::Signal => 1,
        }
    }

    /// Maps a wire integer back to a kind, or `None` if it is unknown.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Chat),
            1 => Some(Self::Signal),
            _ => None,
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(self.code())
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "Chat"),
            Self::Signal => write!(f, "Signal"),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatPayload
// ---------------------------------------------------------------------------

/// One chat line as it travels between clients.
///
/// `timestamp` is an ISO-8601 string taken when the line was composed,
/// not when it hit the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub sender: String,
    pub message: String,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Signaling payloads
// ---------------------------------------------------------------------------

/// Which half of the offer/answer exchange an SDP blob belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => write!(f, "offer"),
            Self::Answer => write!(f, "answer"),
        }
    }
}

/// An SDP description in the shape browsers produce:
/// `{ "type": "offer", "sdp": "v=0..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A trickled ICE candidate: `{ "candidate": ..., "sdpMid"?: ..., "sdpMLineIndex"?: n }`.
///
/// Optional fields are omitted when absent and accept either a missing
/// key or `null` on the way in. Extra keys such as `usernameFragment`
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,

    #[serde(
        rename = "sdpMid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mid: Option<String>,

    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }

    /// Sets the media stream identification tag and line index.
    pub fn with_mid(mut self, mid: impl Into<String>, index: u16) -> Self {
        self.sdp_mid = Some(mid.into());
        self.sdp_m_line_index = Some(index);
        self
    }
}

/// The untagged wire forms a signaling payload can take.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireSignal {
    Description(SessionDescription),
    Candidate(IceCandidate),
}

/// A WebRTC negotiation message.
///
/// The wire format has no explicit discriminator between descriptions
/// and candidates (browsers send `RTCSessionDescription` and
/// `RTCIceCandidate` JSON as-is), so this type converts through an
/// untagged intermediate. In Rust it is an ordinary closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireSignal", into = "WireSignal")]
pub enum SignalPayload {
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate(IceCandidate),
}

impl SignalPayload {
    /// Short label for logs: `offer`, `answer` or `candidate`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate(_) => "candidate",
        }
    }
}

impl From<WireSignal> for SignalPayload {
    fn from(wire: WireSignal) -> Self {
        match wire {
            WireSignal::Description(desc) => desc.into(),
            WireSignal::Candidate(c) => Self::IceCandidate(c),
        }
    }
}

impl From<SignalPayload> for WireSignal {
    fn from(payload: SignalPayload) -> Self {
        match payload {
            SignalPayload::Offer { sdp } => {
                Self::Description(SessionDescription::offer(sdp))
            }
            SignalPayload::Answer { sdp } => {
                Self::Description(SessionDescription::answer(sdp))
            }
            SignalPayload::IceCandidate(c) => Self::Candidate(c),
        }
    }
}

impl From<SessionDescription> for SignalPayload {
    fn from(desc: SessionDescription) -> Self {
        match desc.sdp_type {
            SdpType::Offer => Self::Offer { sdp: desc.sdp },
            SdpType::Answer => Self::Answer { sdp: desc.sdp },
        }
    }
}

impl From<IceCandidate> for SignalPayload {
    fn from(c: IceCandidate) -> Self {
        Self::IceCandidate(c)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame. Every message on the relay connection is one.
///
/// Modelled as an enum rather than a `{kind, payload}` struct so a chat
/// kind can never carry a signal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Chat(ChatPayload),
    Signal(SignalPayload),
}

impl Envelope {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Chat(_) => MessageKind::Chat,
            Self::Signal(_) => MessageKind::Signal,
        }
    }
}

impl From<ChatPayload> for Envelope {
    fn from(p: ChatPayload) -> Self {
        Self::Chat(p)
    }
}

impl From<SignalPayload> for Envelope {
    fn from(p: SignalPayload) -> Self {
        Self::Signal(p)
    }
}

#[derive(Serialize)]
struct WireEnvelope<'a, P> {
    #[serde(rename = "type")]
    kind: MessageKind,
    payload: &'a P,
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        match self {
            Self::Chat(payload) => WireEnvelope { kind, payload }.serialize(s),
            Self::Signal(payload) => {
                WireEnvelope { kind, payload }.serialize(s)
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
