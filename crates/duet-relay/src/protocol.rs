//! Relay-level wire protocol. Only the hello and the small control frames
//! are parsed; relay traffic itself is forwarded as opaque text frames.

use serde::{Deserialize, Serialize};

/// First message a client sends. Carries the bearer token in every
/// variant; nothing happens on a connection before it verifies.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientHello {
    /// Start a new pairing and wait for a partner.
    #[serde(rename = "create_pairing")]
    CreatePairing { token: String },

    /// Consume a pairing code typed over from the partner.
    #[serde(rename = "join_pairing")]
    JoinPairing { token: String, code: String },

    /// Reconnect to an existing pairing session.
    #[serde(rename = "attach")]
    Attach { token: String, session_id: String },
}

impl ClientHello {
    /// The bearer token, whichever operation was asked for.
    pub fn token(&self) -> &str {
        match self {
            ClientHello::CreatePairing { token }
            | ClientHello::JoinPairing { token, .. }
            | ClientHello::Attach { token, .. } => token,
        }
    }
}

/// Control frames a registered client may send. Parsed before relay
/// classification; anything that is not a control frame gets routed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlRequest {
    #[serde(rename = "status")]
    Status,
}

/// Messages the relay sends back to clients.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Reply to `create_pairing`: the code to read to the partner.
    #[serde(rename = "pairing_created")]
    PairingCreated { session_id: String, code: String },

    /// Reply to `join_pairing` and `attach`.
    #[serde(rename = "session_ready")]
    SessionReady { session_id: String },

    #[serde(rename = "peer_connected")]
    PeerConnected,

    #[serde(rename = "peer_disconnected")]
    PeerDisconnected,

    /// Reply to a `status` control frame.
    #[serde(rename = "status")]
    Status { paired: bool, partner_present: bool },

    #[serde(rename = "error")]
    Error { reason: String },
}

impl ServerFrame {
    pub fn to_json(&self) -> String {
        // All variants are plain data; serialization cannot fail.
        serde_json::to_string(self).expect("server frames serialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_variants_parse() {
        let hello: ClientHello =
            serde_json::from_str(r#"{"type":"create_pairing","token":"t"}"#).unwrap();
        assert!(matches!(hello, ClientHello::CreatePairing { .. }));

        let hello: ClientHello =
            serde_json::from_str(r#"{"type":"join_pairing","token":"t","code":"482913"}"#)
                .unwrap();
        assert!(matches!(
            hello,
            ClientHello::JoinPairing { code, .. } if code == "482913"
        ));

        let hello: ClientHello =
            serde_json::from_str(r#"{"type":"attach","token":"t","session_id":"s"}"#).unwrap();
        assert!(matches!(hello, ClientHello::Attach { .. }));
    }

    #[test]
    fn relay_frames_are_not_control_requests() {
        assert!(serde_json::from_str::<ControlRequest>(r#"{"type":"status"}"#).is_ok());
        assert!(
            serde_json::from_str::<ControlRequest>(r#"{"type":"chat","payload":{}}"#).is_err()
        );
    }

    #[test]
    fn server_frame_wire_shape() {
        let json = ServerFrame::PairingCreated {
            session_id: "s1".into(),
            code: "482913".into(),
        }
        .to_json();
        assert_eq!(
            json,
            r#"{"type":"pairing_created","session_id":"s1","code":"482913"}"#
        );

        assert_eq!(
            ServerFrame::PeerDisconnected.to_json(),
            r#"{"type":"peer_disconnected"}"#
        );
    }
}
