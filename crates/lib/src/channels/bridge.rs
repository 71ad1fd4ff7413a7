//! Bridge channel: talks to a chat-session bridge process over HTTP.
//!
//! The bridge owns pairing and the session; it POSTs events to the relay's
//! `/transport/events` route and serves `sendMessage` and `downloadMedia` for the relay.

use crate::channels::handle::{ChannelHandle, MediaPayload};
use crate::channels::inbound::InboundEvent;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DownloadMediaResponse {
    Media(MediaPayload),
    Empty(Option<serde_json::Value>),
}

/// HTTP connector for the chat-session bridge.
pub struct BridgeChannel {
    id: String,
    base_url: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl BridgeChannel {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            id: "bridge".to_string(),
            base_url,
            running: AtomicBool::new(true),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a text message to a chat via the bridge's sendMessage route.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), String> {
        if !self.running() {
            return Err("bridge channel stopped".to_string());
        }
        let url = format!("{}/sendMessage", self.base_url);
        let body = serde_json::json!({ "chatId": chat_id, "text": text });
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("sendMessage failed: {} {}", status, body));
        }
        Ok(())
    }

    /// Fetch media for an event. Returns None when the event has no media ref or the bridge answers null.
    pub async fn download_media(&self, event: &InboundEvent) -> Result<Option<MediaPayload>, String> {
        let Some(ref media_ref) = event.media_ref else {
            return Ok(None);
        };
        let url = format!("{}/downloadMedia", self.base_url);
        let body = serde_json::json!({ "mediaRef": media_ref, "from": event.sender_id });
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("downloadMedia failed: {} {}", status, body));
        }
        let data: DownloadMediaResponse = res.json().await.map_err(|e| e.to_string())?;
        match data {
            DownloadMediaResponse::Media(media) => Ok(Some(media)),
            DownloadMediaResponse::Empty(_) => Ok(None),
        }
    }
}

#[async_trait]
impl ChannelHandle for BridgeChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), String> {
        BridgeChannel::send_message(self, recipient_id, text).await
    }

    async fn download_media(&self, event: &InboundEvent) -> Result<Option<MediaPayload>, String> {
        BridgeChannel::download_media(self, event).await
    }
}
