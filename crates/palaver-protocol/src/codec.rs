//! Codec trait and implementations for envelope framing.
//!
//! A codec turns an [`Envelope`] into one transport frame and back.
//! Decoding is two-stage: first the outer `{type, payload}` document,
//! then the payload against the shape its `type` demands. That split is
//! what lets us report [`DecodeError::UnknownType`] separately from
//! [`DecodeError::Malformed`].

use crate::{DecodeError, Envelope, ProtocolError};

/// Converts envelopes to frames and frames to envelopes.
///
/// Implementations are pure: no I/O, no shared state. For every valid
/// envelope `e`, `decode(&encode(&e)?) == Ok(e)`.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an envelope into a single frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a single frame.
    ///
    /// # Errors
    /// - [`DecodeError::Malformed`] — not a well-formed document, or the
    ///   payload doesn't fit its `type`
    /// - [`DecodeError::UnknownType`] — `type` outside the closed set
    fn decode(&self, data: &[u8]) -> Result<Envelope, DecodeError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that speaks the JSON wire format browsers use.
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use palaver_protocol::{Codec, Envelope, JsonCodec, SignalPayload};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::Signal(SignalPayload::Offer { sdp: "v=0".into() });
///
/// let bytes = codec.encode(&envelope).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), envelope);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

/// The outer document before the payload has been interpreted.
#[cfg(feature = "json")]
#[derive(serde::Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: i64,
    payload: serde_json::Value,
}

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(envelope).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<Envelope, DecodeError> {
        use crate::{ChatPayload, MessageKind, SignalPayload};

        let raw: RawEnvelope = serde_json::from_slice(data)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let kind = MessageKind::from_code(raw.kind)
            .ok_or(DecodeError::UnknownType(raw.kind))?;

        let malformed =
            |e: serde_json::Error| DecodeError::Malformed(format!("{kind} payload: {e}"));

        match kind {
            MessageKind::Chat => serde_json::from_value::<ChatPayload>(raw.payload)
                .map(Envelope::Chat)
                .map_err(malformed),
            MessageKind::Signal => {
                serde_json::from_value::<SignalPayload>(raw.payload)
                    .map(Envelope::Signal)
                    .map_err(malformed)
            }
        }
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ChatPayload, IceCandidate, SignalPayload};

    fn chat(message: &str) -> Envelope {
        Envelope::Chat(ChatPayload {
            sender: "Your_Sender_Name".into(),
            message: message.into(),
            timestamp: "2024-05-01T12:00:00.000Z".into(),
        })
    }

    // =====================================================================
    // Round trip
    // =====================================================================

    #[test]
    fn test_round_trip_preserves_every_variant() {
        let codec = JsonCodec;
        let samples = [
            chat("hi"),
            chat("  spaces and \"quotes\" and ünïcödé  "),
            Envelope::Signal(SignalPayload::Offer {
                sdp: "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n".into(),
            }),
            Envelope::Signal(SignalPayload::Answer { sdp: "v=0\r\n".into() }),
            Envelope::Signal(IceCandidate::new("candidate:0").into()),
            Envelope::Signal(
                IceCandidate::new("candidate:1").with_mid("audio", 3).into(),
            ),
        ];

        for envelope in samples {
            let bytes = codec.encode(&envelope).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            assert_eq!(decoded, envelope);
        }
    }

    #[test]
    fn test_decode_accepts_browser_produced_frame() {
        let frame = br#"{"type":1,"payload":{"candidate":"candidate:2 1 udp 2122260223 192.168.1.2 54321 typ host","sdpMid":"0","sdpMLineIndex":0,"usernameFragment":"x"}}"#;
        let decoded = JsonCodec.decode(frame).unwrap();
        assert_eq!(
            decoded,
            Envelope::Signal(
                IceCandidate::new(
                    "candidate:2 1 udp 2122260223 192.168.1.2 54321 typ host"
                )
                .with_mid("0", 0)
                .into()
            )
        );
    }

    // =====================================================================
    // Error classification
    // =====================================================================

    #[test]
    fn test_decode_non_json_is_malformed() {
        let result = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_unknown_type_is_unknown_type() {
        let result = JsonCodec.decode(br#"{"type":7,"payload":{}}"#);
        assert_eq!(result, Err(DecodeError::UnknownType(7)));
    }

    #[test]
    fn test_decode_negative_type_is_unknown_type() {
        let result = JsonCodec.decode(br#"{"type":-1,"payload":{}}"#);
        assert_eq!(result, Err(DecodeError::UnknownType(-1)));
    }

    #[test]
    fn test_decode_string_type_is_malformed() {
        let result = JsonCodec.decode(br#"{"type":"chat","payload":{}}"#);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_missing_payload_is_malformed() {
        let result = JsonCodec.decode(br#"{"type":0}"#);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_payload_shape_mismatch_is_malformed() {
        // A chat payload labelled as a signal.
        let result = JsonCodec.decode(
            br#"{"type":1,"payload":{"sender":"a","message":"b","timestamp":"c"}}"#,
        );
        assert!(matches!(result, Err(DecodeError::Malformed(_))));

        // A signal payload labelled as chat.
        let result =
            JsonCodec.decode(br#"{"type":0,"payload":{"type":"offer","sdp":"v=0"}}"#);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_truncated_frame_is_malformed() {
        let bytes = JsonCodec.encode(&chat("hello")).unwrap();
        let result = JsonCodec.decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }
}
