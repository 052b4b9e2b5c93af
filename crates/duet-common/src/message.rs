//! The relay message envelope.
//!
//! The relay only ever reads the `type` discriminator; the payload is
//! opaque and forwarded to the partner byte-for-byte.

use serde::{Deserialize, Serialize};

/// Recognized relay message kinds. Anything else deserializes to
/// `Unknown` so new client versions don't break old relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Offer,
    Answer,
    IceCandidate,
    Chat,
    ThumbKiss,
    VideoSync,
    #[serde(other)]
    Unknown,
}

impl MessageKind {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, MessageKind::Unknown)
    }
}

/// Envelope `{type, payload}` for frames exchanged between the two
/// participants of a pairing. Exists only for the duration of a forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RelayMessage {
    /// Read only the discriminator from a raw frame, ignoring the payload.
    /// `None` means the frame is not a well-formed envelope at all.
    pub fn peek_kind(raw: &str) -> Option<MessageKind> {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(rename = "type")]
            kind: MessageKind,
        }
        serde_json::from_str::<Probe>(raw).ok().map(|p| p.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&MessageKind::IceCandidate).unwrap(),
            "\"ice-candidate\""
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::ThumbKiss).unwrap(),
            "\"thumb-kiss\""
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::VideoSync).unwrap(),
            "\"video-sync\""
        );
    }

    #[test]
    fn unknown_kind_deserializes() {
        let kind: MessageKind = serde_json::from_str("\"hologram\"").unwrap();
        assert_eq!(kind, MessageKind::Unknown);
        assert!(!kind.is_recognized());
    }

    #[test]
    fn peek_kind_reads_discriminator_only() {
        let raw = r#"{"type":"chat","payload":{"text":"hi"}}"#;
        assert_eq!(RelayMessage::peek_kind(raw), Some(MessageKind::Chat));

        // Payload shape is irrelevant; it is never inspected.
        let raw = r#"{"type":"offer","payload":"an sdp blob","extra":42}"#;
        assert_eq!(RelayMessage::peek_kind(raw), Some(MessageKind::Offer));

        // Missing payload is still a well-formed envelope probe.
        let raw = r#"{"type":"thumb-kiss"}"#;
        assert_eq!(RelayMessage::peek_kind(raw), Some(MessageKind::ThumbKiss));
    }

    #[test]
    fn peek_kind_rejects_malformed() {
        assert_eq!(RelayMessage::peek_kind("not json"), None);
        assert_eq!(RelayMessage::peek_kind(r#"{"payload":{}}"#), None);
        assert_eq!(RelayMessage::peek_kind(r#"{"type":42}"#), None);
    }

    #[test]
    fn envelope_round_trip() {
        let msg = RelayMessage {
            kind: MessageKind::VideoSync,
            payload: serde_json::json!({"position": 42.5, "state": "playing"}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: RelayMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, MessageKind::VideoSync);
        assert_eq!(back.payload["position"], 42.5);
    }
}
