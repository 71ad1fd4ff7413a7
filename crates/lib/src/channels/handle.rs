//! Transport handle: the send and media-download capabilities the relay consumes.

use crate::channels::inbound::InboundEvent;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Media downloaded for an inbound event. `data` is base64 as delivered by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    pub mimetype: String,
    pub data: String,
}

impl MediaPayload {
    /// Decode the base64 payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.data.trim())
    }

    /// MIME subtype used as file extension (`audio/ogg; codecs=opus` -> `ogg`).
    pub fn extension(&self) -> &str {
        let subtype = self
            .mimetype
            .split('/')
            .nth(1)
            .unwrap_or("bin");
        let subtype = subtype.split(';').next().unwrap_or(subtype).trim();
        if subtype.is_empty() {
            "bin"
        } else {
            subtype
        }
    }
}

/// Handle to the running transport (stop, send message, download media).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Transport id (e.g. "bridge").
    fn id(&self) -> &str;
    /// Stop the transport connector.
    fn stop(&self);
    /// Send a text message to a chat. Default returns error.
    async fn send_message(&self, _recipient_id: &str, _text: &str) -> Result<(), String> {
        Err("send not implemented".to_string())
    }
    /// Download media attached to an event. `Ok(None)` when the transport has no media for it.
    async fn download_media(&self, _event: &InboundEvent) -> Result<Option<MediaPayload>, String> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(mimetype: &str) -> MediaPayload {
        MediaPayload {
            mimetype: mimetype.to_string(),
            data: String::new(),
        }
    }

    #[test]
    fn extension_strips_codec_parameters() {
        assert_eq!(media("audio/ogg; codecs=opus").extension(), "ogg");
        assert_eq!(media("audio/mpeg").extension(), "mpeg");
    }

    #[test]
    fn extension_falls_back_when_subtype_missing() {
        assert_eq!(media("audio").extension(), "bin");
        assert_eq!(media("audio/").extension(), "bin");
    }

    #[test]
    fn decode_base64_data() {
        let m = MediaPayload {
            mimetype: "audio/ogg".to_string(),
            data: "T2dnUw==".to_string(),
        };
        assert_eq!(m.decode().expect("decode"), b"OggS".to_vec());
    }
}
