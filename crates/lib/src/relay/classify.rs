//! Inbound event classification: ignore, voice path or text path.

use crate::channels::InboundEvent;

/// Why an event was dropped before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotReady,
    MissingSender,
    SelfOriginated,
    StatusBroadcast,
    GroupOrigin,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::NotReady => "transport not ready",
            IgnoreReason::MissingSender => "missing sender",
            IgnoreReason::SelfOriginated => "sent by self",
            IgnoreReason::StatusBroadcast => "status broadcast",
            IgnoreReason::GroupOrigin => "group chat",
        }
    }
}

/// Where an inbound event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Ignore(IgnoreReason),
    /// Voice note or audio: download media and upload as multipart.
    Voice,
    /// Plain chat text with its body.
    Text(String),
    /// Handled kind is not supported (image, sticker, chat without body...). Dropped silently, not counted.
    Unsupported,
}

/// Decide what to do with an event. Checks run in order: readiness, sender, self, status, group.
pub fn classify(event: &InboundEvent, ready: bool) -> Route {
    if !ready {
        return Route::Ignore(IgnoreReason::NotReady);
    }
    if event.sender_id.trim().is_empty() {
        return Route::Ignore(IgnoreReason::MissingSender);
    }
    if event.is_self_originated {
        return Route::Ignore(IgnoreReason::SelfOriginated);
    }
    if event.is_status_broadcast {
        return Route::Ignore(IgnoreReason::StatusBroadcast);
    }
    if event.is_group_originated() {
        return Route::Ignore(IgnoreReason::GroupOrigin);
    }
    if event.kind.is_voice() {
        return Route::Voice;
    }
    match (&event.kind, &event.body) {
        (crate::channels::MessageKind::Chat, Some(body)) => Route::Text(body.clone()),
        _ => Route::Unsupported,
    }
}
