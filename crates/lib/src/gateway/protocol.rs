//! Dashboard push-channel protocol types.

use crate::state::{ConnectionState, Stats};
use serde::{Deserialize, Serialize};

/// Wire event frame: `{ "type": "event", "event", "payload" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEvent {
    #[serde(rename = "type")]
    pub typ: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Event pushed to every connected dashboard observer.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    /// A formatted log line (timestamp prefix included).
    Log(String),
    /// Full stats snapshot after a counter changed.
    Stats(Stats),
    /// Connection-state transition.
    Status(ConnectionState),
    /// Raw pairing code, rendered client-side into a QR image.
    Qr(String),
    /// Server is going away; clients should stop reading.
    Shutdown,
}

impl DashboardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DashboardEvent::Log(_) => "log",
            DashboardEvent::Stats(_) => "stats",
            DashboardEvent::Status(_) => "status",
            DashboardEvent::Qr(_) => "qr",
            DashboardEvent::Shutdown => "shutdown",
        }
    }

    fn payload(&self) -> serde_json::Value {
        match self {
            DashboardEvent::Log(line) => serde_json::Value::String(line.clone()),
            DashboardEvent::Stats(stats) => serde_json::to_value(stats).unwrap_or_default(),
            DashboardEvent::Status(status) => serde_json::to_value(status).unwrap_or_default(),
            DashboardEvent::Qr(code) => serde_json::Value::String(code.clone()),
            DashboardEvent::Shutdown => serde_json::json!({}),
        }
    }

    pub fn to_ws_event(&self) -> WsEvent {
        WsEvent {
            typ: "event".to_string(),
            event: self.name().to_string(),
            payload: self.payload(),
        }
    }

    /// Serialized text frame for the push channel.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(&self.to_ws_event()).unwrap_or_else(|_| {
            format!(r#"{{"type":"event","event":"{}","payload":{{}}}}"#, self.name())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_frame_carries_line_as_string_payload() {
        let frame = DashboardEvent::Log("10:00:00 Reply sent".to_string()).to_frame();
        let v: serde_json::Value = serde_json::from_str(&frame).expect("json");
        assert_eq!(v["type"], "event");
        assert_eq!(v["event"], "log");
        assert_eq!(v["payload"], "10:00:00 Reply sent");
    }

    #[test]
    fn status_frame_uses_ready_and_authenticated() {
        let frame = DashboardEvent::Status(ConnectionState {
            ready: false,
            authenticated: true,
        })
        .to_frame();
        let v: serde_json::Value = serde_json::from_str(&frame).expect("json");
        assert_eq!(v["event"], "status");
        assert_eq!(v["payload"], serde_json::json!({ "ready": false, "authenticated": true }));
    }

    #[test]
    fn stats_frame_is_camel_case_snapshot() {
        let frame = DashboardEvent::Stats(Stats {
            messages_received: 3,
            replies_sent: 2,
            errors: 1,
            start_time: 1_700_000_000_000,
        })
        .to_frame();
        let v: serde_json::Value = serde_json::from_str(&frame).expect("json");
        assert_eq!(v["payload"]["messagesReceived"], 3);
        assert_eq!(v["payload"]["repliesSent"], 2);
        assert_eq!(v["payload"]["errors"], 1);
        assert_eq!(v["payload"]["startTime"], 1_700_000_000_000i64);
    }
}
