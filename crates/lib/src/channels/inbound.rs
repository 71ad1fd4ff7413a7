//! Events delivered by the chat-session transport: lifecycle transitions and inbound messages.

use serde::{Deserialize, Serialize};

/// Sender id suffix the transport uses for group conversations.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Lifecycle or message event emitted by the transport. Wire: `{ "event": "...", "payload": {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum TransportEvent {
    /// Pairing code to be rendered as a scannable QR code.
    Qr { code: String },
    Ready,
    Authenticated,
    AuthFailure {
        #[serde(default)]
        message: Option<String>,
    },
    Message(InboundEvent),
}

/// Kind of inbound message, from the transport's `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain chat text.
    Chat,
    /// Push-to-talk voice note.
    Ptt,
    Audio,
    #[serde(other)]
    Other,
}

impl MessageKind {
    pub fn is_voice(&self) -> bool {
        matches!(self, MessageKind::Ptt | MessageKind::Audio)
    }

    /// Wire name forwarded to the webhook as `messageType`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::Ptt => "ptt",
            MessageKind::Audio => "audio",
            MessageKind::Other => "other",
        }
    }
}

/// A message received by the transport. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(rename = "from")]
    pub sender_id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub body: Option<String>,
    /// Opaque handle the transport resolves in `download_media`.
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default, rename = "fromMe")]
    pub is_self_originated: bool,
    #[serde(default, rename = "isStatus")]
    pub is_status_broadcast: bool,
    #[serde(default, rename = "isGroup")]
    pub is_group: bool,
}

impl InboundEvent {
    /// Group origin: explicit flag from the transport or the group sender suffix.
    pub fn is_group_originated(&self) -> bool {
        self.is_group || self.sender_id.ends_with(GROUP_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_event_with_wire_names() {
        let event: TransportEvent = serde_json::from_str(
            r#"{"event":"message","payload":{"from":"4915112345@c.us","type":"chat","body":"hello","fromMe":false,"isStatus":false}}"#,
        )
        .expect("parse");
        let TransportEvent::Message(msg) = event else {
            panic!("expected message event");
        };
        assert_eq!(msg.sender_id, "4915112345@c.us");
        assert_eq!(msg.kind, MessageKind::Chat);
        assert_eq!(msg.body.as_deref(), Some("hello"));
        assert!(!msg.is_group_originated());
    }

    #[test]
    fn unknown_message_type_maps_to_other() {
        let msg: InboundEvent =
            serde_json::from_str(r#"{"from":"1@c.us","type":"sticker"}"#).expect("parse");
        assert_eq!(msg.kind, MessageKind::Other);
        assert!(msg.body.is_none());
    }

    #[test]
    fn lifecycle_events_parse_without_payload() {
        let ready: TransportEvent = serde_json::from_str(r#"{"event":"ready"}"#).expect("parse");
        assert!(matches!(ready, TransportEvent::Ready));
        let failure: TransportEvent =
            serde_json::from_str(r#"{"event":"auth_failure","payload":{}}"#).expect("parse");
        assert!(matches!(failure, TransportEvent::AuthFailure { message: None }));
        let qr: TransportEvent =
            serde_json::from_str(r#"{"event":"qr","payload":{"code":"2@abc"}}"#).expect("parse");
        assert!(matches!(qr, TransportEvent::Qr { ref code } if code == "2@abc"));
    }

    #[test]
    fn group_origin_from_suffix_or_flag() {
        let by_suffix: InboundEvent =
            serde_json::from_str(r#"{"from":"12036304@g.us","type":"chat"}"#).expect("parse");
        assert!(by_suffix.is_group_originated());
        let by_flag: InboundEvent =
            serde_json::from_str(r#"{"from":"1@c.us","type":"chat","isGroup":true}"#)
                .expect("parse");
        assert!(by_flag.is_group_originated());
    }
}
