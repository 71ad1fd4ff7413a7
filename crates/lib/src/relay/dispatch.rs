//! Webhook dispatch: POST one payload to the configured endpoint and return its response.
//! No timeout and no retry.

use crate::relay::media::VoiceUpload;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// JSON body for text messages: `{ from, messageType, body }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    pub from: String,
    pub message_type: String,
    pub body: String,
}

/// Exactly one payload shape per event.
#[derive(Debug, Clone)]
pub enum OutboundPayload {
    Text(TextPayload),
    Voice(VoiceUpload),
}

/// Webhook reply: HTTP status and body. The body is parsed JSON when it parses, otherwise the raw text as a string.
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Client for the single webhook endpoint.
#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn dispatch(&self, payload: &OutboundPayload) -> Result<WebhookResponse, WebhookError> {
        let request = self.client.post(&self.url);
        let request = match payload {
            OutboundPayload::Text(text) => request.json(text),
            OutboundPayload::Voice(voice) => request.multipart(voice.to_form()?),
        };
        let res = request.send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(WebhookResponse {
            status: status.as_u16(),
            body: parse_body(text),
        })
    }
}

fn parse_body(text: String) -> serde_json::Value {
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => serde_json::Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn text_payload() -> OutboundPayload {
        OutboundPayload::Text(TextPayload {
            from: "4915112345@c.us".to_string(),
            message_type: "chat".to_string(),
            body: "hello".to_string(),
        })
    }

    #[test]
    fn body_falls_back_to_raw_string() {
        assert_eq!(parse_body(r#"{"reply":"hi"}"#.to_string()), json!({ "reply": "hi" }));
        assert_eq!(parse_body("plain words".to_string()), json!("plain words"));
        assert_eq!(parse_body(String::new()), json!(""));
    }

    #[tokio::test]
    async fn text_payload_is_posted_as_json() {
        let server = MockServer::start();
        let hook = server.mock(|when, then| {
            when.method(POST)
                .path("/webhook")
                .header("content-type", "application/json")
                .json_body(json!({
                    "from": "4915112345@c.us",
                    "messageType": "chat",
                    "body": "hello"
                }));
            then.status(200).json_body(json!({ "reply": "hi" }));
        });
        let client = WebhookClient::new(server.url("/webhook"));
        let res = client.dispatch(&text_payload()).await.expect("dispatch");
        hook.assert_calls(1);
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({ "reply": "hi" }));
    }

    #[tokio::test]
    async fn voice_payload_is_posted_as_multipart() {
        let server = MockServer::start();
        let hook = server.mock(|when, then| {
            when.method(POST)
                .path("/webhook")
                .body_includes("name=\"from\"")
                .body_includes("name=\"messageType\"")
                .body_includes("name=\"voice\"; filename=\"voice_1.ogg\"")
                .body_includes("OggS");
            then.status(200).body("thanks");
        });
        let client = WebhookClient::new(server.url("/webhook"));
        let payload = OutboundPayload::Voice(VoiceUpload {
            sender_id: "4915112345@c.us".to_string(),
            message_kind: "ptt".to_string(),
            file_name: "voice_1.ogg".to_string(),
            mime_type: "audio/ogg".to_string(),
            bytes: b"OggS".to_vec(),
        });
        let res = client.dispatch(&payload).await.expect("dispatch");
        hook.assert_calls(1);
        assert_eq!(res.body, json!("thanks"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/webhook");
            then.status(500).body("boom");
        });
        let client = WebhookClient::new(server.url("/webhook"));
        let err = client.dispatch(&text_payload()).await.unwrap_err();
        assert!(matches!(err, WebhookError::Status { status: 500, ref body } if body == "boom"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        let client = WebhookClient::new("http://127.0.0.1:9/webhook");
        let err = client.dispatch(&text_payload()).await.unwrap_err();
        assert!(matches!(err, WebhookError::Request(_)));
    }
}
