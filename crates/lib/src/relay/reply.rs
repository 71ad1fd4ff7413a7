//! Reply extraction and humanized delay.

use rand::Rng;
use std::time::Duration;

/// Result of reading a reply out of a webhook response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyExtraction {
    Found(String),
    NotFound,
}

/// `{ "reply": "<string>" }` or a bare string; anything else, or blank text, is no reply.
pub fn extract_reply(body: &serde_json::Value) -> ReplyExtraction {
    let text = match body {
        serde_json::Value::Object(map) => map.get("reply").and_then(|v| v.as_str()),
        serde_json::Value::String(s) => Some(s.as_str()),
        _ => None,
    };
    match text {
        Some(t) if !t.trim().is_empty() => ReplyExtraction::Found(t.to_string()),
        _ => ReplyExtraction::NotFound,
    }
}

/// Uniform random delay in `[min_ms, max_ms]` before sending a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyDelay {
    min_ms: u64,
    max_ms: u64,
}

impl ReplyDelay {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    pub fn bounds(&self) -> (u64, u64) {
        (self.min_ms, self.max_ms)
    }

    pub fn sample(&self) -> Duration {
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

impl Default for ReplyDelay {
    fn default() -> Self {
        Self::new(2000, 4000)
    }
}
