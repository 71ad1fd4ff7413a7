//! Message relay: classify inbound chat events, forward them to the webhook and send back its reply.
//!
//! Each inbound message is handled on its own task, so a slow webhook or a pending reply delay
//! never holds up other messages. Replies to the same sender may therefore go out of order.

mod classify;
mod dispatch;
mod media;
mod reply;

pub use classify::{classify, IgnoreReason, Route};
pub use dispatch::{OutboundPayload, TextPayload, WebhookClient, WebhookError, WebhookResponse};
pub use media::{capture_voice, voice_file_name, ScratchFile, VoiceUpload};
pub use reply::{extract_reply, ReplyDelay, ReplyExtraction};

use crate::channels::{ChannelHandle, InboundEvent, TransportEvent};
use crate::config::Config;
use crate::state::{ConnectionState, RelayState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Characters of a text message echoed to the log.
const TEXT_PREVIEW_CHARS: usize = 50;

/// Failure while handling one inbound message. Caught at the message boundary.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("media fetch failed: {0}")]
    MediaFetch(String),
    #[error("scratch file: {0}")]
    Scratch(#[from] std::io::Error),
    #[error(transparent)]
    Dispatch(#[from] WebhookError),
    #[error("sending reply failed: {0}")]
    TransportSend(String),
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Ignored(IgnoreReason),
    Unsupported,
    /// Dispatched; the webhook gave nothing to send back.
    NoReply,
    Replied(String),
    Failed(String),
}

/// Relay settings resolved from config.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub scratch_dir: PathBuf,
    pub reply_delay: ReplyDelay,
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scratch_dir: config.relay.scratch_dir.clone(),
            reply_delay: ReplyDelay::new(
                config.relay.reply_delay_min_ms,
                config.relay.reply_delay_max_ms,
            ),
        }
    }
}

/// The relay pipeline. Cheap to clone; clones share state, transport and webhook client.
#[derive(Clone)]
pub struct Relay {
    state: RelayState,
    transport: Arc<dyn ChannelHandle>,
    webhook: WebhookClient,
    settings: Arc<RelaySettings>,
}

impl Relay {
    pub fn new(
        state: RelayState,
        transport: Arc<dyn ChannelHandle>,
        webhook: WebhookClient,
        settings: RelaySettings,
    ) -> Self {
        Self {
            state,
            transport,
            webhook,
            settings: Arc::new(settings),
        }
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Apply a transport event. Messages are handled on a spawned task whose handle is returned.
    pub fn handle_transport_event(&self, event: TransportEvent) -> Option<JoinHandle<MessageOutcome>> {
        match event {
            TransportEvent::Qr { code } => {
                self.state.info("QR code generated");
                self.state.set_qr(code);
                None
            }
            TransportEvent::Authenticated => {
                self.state.info("Authenticated");
                self.state.set_connection(ConnectionState {
                    ready: false,
                    authenticated: true,
                });
                None
            }
            TransportEvent::Ready => {
                self.state.info("Bot is ready!");
                self.state.set_connection(ConnectionState {
                    ready: true,
                    authenticated: true,
                });
                None
            }
            TransportEvent::AuthFailure { message } => {
                match message {
                    Some(m) => self.state.error(format!("Auth failed: {}", m)),
                    None => self.state.error("Auth failed"),
                };
                self.state.set_connection(ConnectionState {
                    ready: false,
                    authenticated: false,
                });
                None
            }
            TransportEvent::Message(msg) => Some(self.spawn_message(msg)),
        }
    }

    /// Handle a message on its own task.
    pub fn spawn_message(&self, event: InboundEvent) -> JoinHandle<MessageOutcome> {
        let relay = self.clone();
        tokio::spawn(async move { relay.handle_message(event).await })
    }

    /// Classify, dispatch and reply. Errors are counted and logged here and never propagate.
    pub async fn handle_message(&self, event: InboundEvent) -> MessageOutcome {
        let route = classify(&event, self.state.is_ready());
        match route {
            Route::Ignore(reason) => {
                log::debug!("ignoring message from {}: {}", event.sender_id, reason.as_str());
                return MessageOutcome::Ignored(reason);
            }
            Route::Unsupported => {
                log::debug!(
                    "dropping unsupported {} message from {}",
                    event.kind.as_str(),
                    event.sender_id
                );
                return MessageOutcome::Unsupported;
            }
            Route::Voice | Route::Text(_) => {}
        }

        self.state.record_received();
        match self.forward(&event, route).await {
            Ok(Some(reply)) => MessageOutcome::Replied(reply),
            Ok(None) => MessageOutcome::NoReply,
            Err(e) => {
                self.state.record_error();
                let message = e.to_string();
                self.state.error(format!("Error: {}", message));
                MessageOutcome::Failed(message)
            }
        }
    }

    async fn forward(&self, event: &InboundEvent, route: Route) -> Result<Option<String>, RelayError> {
        let payload = match route {
            Route::Voice => {
                self.state.info("Voice message received");
                let upload =
                    capture_voice(self.transport.as_ref(), event, &self.settings.scratch_dir).await?;
                OutboundPayload::Voice(upload)
            }
            Route::Text(body) => {
                let preview: String = body.chars().take(TEXT_PREVIEW_CHARS).collect();
                self.state.info(format!("Text: {}", preview));
                OutboundPayload::Text(TextPayload {
                    from: event.sender_id.clone(),
                    message_type: event.kind.as_str().to_string(),
                    body,
                })
            }
            Route::Ignore(_) | Route::Unsupported => return Ok(None),
        };

        let response = self.webhook.dispatch(&payload).await?;
        self.deliver_reply(&event.sender_id, &response).await
    }

    /// Send the extracted reply after the humanized delay. Returns the text sent, if any.
    async fn deliver_reply(
        &self,
        recipient_id: &str,
        response: &WebhookResponse,
    ) -> Result<Option<String>, RelayError> {
        let ReplyExtraction::Found(reply) = extract_reply(&response.body) else {
            log::debug!("webhook response for {} carried no reply", recipient_id);
            return Ok(None);
        };
        tokio::time::sleep(self.settings.reply_delay.sample()).await;
        self.transport
            .send_message(recipient_id, &reply)
            .await
            .map_err(RelayError::TransportSend)?;
        self.state.record_reply_sent();
        self.state.info("Reply sent");
        Ok(Some(reply))
    }
}
