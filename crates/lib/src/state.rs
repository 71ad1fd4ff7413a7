//! Relay state: counters, recent log lines and connection status, shared by the relay and the dashboard.
//!
//! Every mutation is published to dashboard observers through a broadcast channel.
//! Publishing never blocks; observers that fall behind skip events.

use crate::gateway::DashboardEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Maximum number of log lines kept for the dashboard.
pub const LOG_CAPACITY: usize = 100;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Process-lifetime counters. Only ever increase; reset on restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub messages_received: u64,
    pub replies_sent: u64,
    pub errors: u64,
    /// Unix ms.
    pub start_time: i64,
}

/// Transport connection status as last reported by lifecycle events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub ready: bool,
    pub authenticated: bool,
}

/// Stats plus log lines, as served by `GET /api/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(flatten)]
    pub stats: Stats,
    pub logs: Vec<String>,
}

/// Bounded FIFO of log lines; the oldest entry is evicted on overflow.
#[derive(Debug, Clone)]
pub struct LogRing {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in arrival order, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

struct Inner {
    stats: Mutex<Stats>,
    logs: Mutex<LogRing>,
    connection: Mutex<ConnectionState>,
    /// Most recent pairing code, kept until the transport is ready.
    last_qr: Mutex<Option<String>>,
    event_tx: broadcast::Sender<DashboardEvent>,
}

/// Shared handle to the relay state. Cheap to clone.
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<Inner>,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RelayState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                stats: Mutex::new(Stats {
                    messages_received: 0,
                    replies_sent: 0,
                    errors: 0,
                    start_time: chrono::Utc::now().timestamp_millis(),
                }),
                logs: Mutex::new(LogRing::new(LOG_CAPACITY)),
                connection: Mutex::new(ConnectionState::default()),
                last_qr: Mutex::new(None),
                event_tx,
            }),
        }
    }

    /// Subscribe to dashboard events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Publish to all observers. No observers is not an error.
    pub fn publish(&self, event: DashboardEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    pub fn stats(&self) -> Stats {
        *lock(&self.inner.stats)
    }

    pub fn logs(&self) -> Vec<String> {
        lock(&self.inner.logs).to_vec()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            stats: self.stats(),
            logs: self.logs(),
        }
    }

    pub fn connection(&self) -> ConnectionState {
        *lock(&self.inner.connection)
    }

    pub fn is_ready(&self) -> bool {
        self.connection().ready
    }

    pub fn last_qr(&self) -> Option<String> {
        lock(&self.inner.last_qr).clone()
    }

    /// Publishes while the stats lock is held so observers see snapshots in mutation order.
    fn update_stats(&self, f: impl FnOnce(&mut Stats)) -> Stats {
        let mut stats = lock(&self.inner.stats);
        f(&mut stats);
        let snapshot = *stats;
        self.publish(DashboardEvent::Stats(snapshot));
        snapshot
    }

    pub fn record_received(&self) -> Stats {
        self.update_stats(|s| s.messages_received += 1)
    }

    pub fn record_reply_sent(&self) -> Stats {
        self.update_stats(|s| s.replies_sent += 1)
    }

    pub fn record_error(&self) -> Stats {
        self.update_stats(|s| s.errors += 1)
    }

    /// Emit a log line through the `log` facade, append it to the ring and push it to observers.
    /// Returns the stored line (with timestamp prefix).
    pub fn log(&self, level: log::Level, message: impl AsRef<str>) -> String {
        let message = message.as_ref();
        log::log!(target: "relay", level, "{}", message);
        let line = format!("{} {}", chrono::Local::now().format("%H:%M:%S"), message);
        let mut logs = lock(&self.inner.logs);
        logs.push(line.clone());
        self.publish(DashboardEvent::Log(line.clone()));
        line
    }

    pub fn info(&self, message: impl AsRef<str>) -> String {
        self.log(log::Level::Info, message)
    }

    pub fn error(&self, message: impl AsRef<str>) -> String {
        self.log(log::Level::Error, message)
    }

    /// Replace the connection state and push a status event.
    pub fn set_connection(&self, next: ConnectionState) -> ConnectionState {
        let mut connection = lock(&self.inner.connection);
        *connection = next;
        if next.ready {
            *lock(&self.inner.last_qr) = None;
        }
        self.publish(DashboardEvent::Status(next));
        next
    }

    /// Remember the pairing code and push it verbatim.
    pub fn set_qr(&self, code: impl Into<String>) {
        let code = code.into();
        *lock(&self.inner.last_qr) = Some(code.clone());
        self.publish(DashboardEvent::Qr(code));
    }

    /// Uptime as (hours, minutes) since start_time.
    pub fn uptime(&self) -> (i64, i64) {
        let elapsed_secs =
            ((chrono::Utc::now().timestamp_millis() - self.stats().start_time) / 1000).max(0);
        (elapsed_secs / 3600, (elapsed_secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_ring_evicts_oldest_first() {
        let mut ring = LogRing::new(LOG_CAPACITY);
        for i in 0..=LOG_CAPACITY {
            ring.push(format!("line {}", i));
        }
        assert_eq!(ring.len(), LOG_CAPACITY);
        let lines = ring.to_vec();
        assert_eq!(lines.first().map(String::as_str), Some("line 1"));
        assert_eq!(lines.last().map(String::as_str), Some("line 100"));
    }

    #[test]
    fn log_ring_zero_capacity_stays_empty() {
        let mut ring = LogRing::new(0);
        ring.push("dropped".to_string());
        assert!(ring.is_empty());
    }

    #[test]
    fn state_log_is_bounded_and_timestamped() {
        let state = RelayState::new();
        for i in 0..150 {
            state.info(format!("event {}", i));
        }
        let logs = state.logs();
        assert_eq!(logs.len(), LOG_CAPACITY);
        assert!(logs[0].ends_with(" event 50"));
        assert!(logs[99].ends_with(" event 149"));
        // HH:MM:SS prefix
        assert_eq!(logs[0].as_bytes()[2], b':');
        assert_eq!(logs[0].as_bytes()[5], b':');
    }

    #[test]
    fn counters_increase_and_publish_snapshots() {
        let state = RelayState::new();
        let mut rx = state.subscribe();
        state.record_received();
        state.record_received();
        let after = state.record_reply_sent();
        assert_eq!(after.messages_received, 2);
        assert_eq!(after.replies_sent, 1);
        assert_eq!(after.errors, 0);

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], DashboardEvent::Stats(after));
    }

    #[test]
    fn concurrent_recorders_publish_increasing_snapshots() {
        for _ in 0..50 {
            let state = RelayState::new();
            let mut rx = state.subscribe();
            std::thread::scope(|scope| {
                for t in 0..8 {
                    let state = &state;
                    scope.spawn(move || {
                        for i in 0..15 {
                            state.record_received();
                            state.info(format!("worker {} line {}", t, i));
                        }
                    });
                }
            });

            let mut last_received = 0;
            let mut published_logs = Vec::new();
            while let Ok(event) = rx.try_recv() {
                match event {
                    DashboardEvent::Stats(stats) => {
                        assert!(stats.messages_received > last_received);
                        last_received = stats.messages_received;
                    }
                    DashboardEvent::Log(line) => published_logs.push(line),
                    other => panic!("unexpected event {:?}", other),
                }
            }
            assert_eq!(last_received, 120);
            assert_eq!(published_logs.len(), 120);
            assert_eq!(published_logs[120 - LOG_CAPACITY..], state.logs()[..]);
        }
    }

    #[test]
    fn log_line_is_pushed_to_observers() {
        let state = RelayState::new();
        let mut rx = state.subscribe();
        let line = state.error("Error: boom");
        assert_eq!(rx.try_recv().ok(), Some(DashboardEvent::Log(line)));
    }

    #[test]
    fn ready_clears_pending_qr() {
        let state = RelayState::new();
        state.set_qr("2@pairing");
        assert_eq!(state.last_qr().as_deref(), Some("2@pairing"));
        state.set_connection(ConnectionState {
            ready: true,
            authenticated: true,
        });
        assert!(state.is_ready());
        assert!(state.last_qr().is_none());
    }

    #[test]
    fn snapshot_serializes_flat() {
        let state = RelayState::new();
        state.record_error();
        state.info("hello");
        let v = serde_json::to_value(state.snapshot()).expect("json");
        assert_eq!(v["errors"], 1);
        assert_eq!(v["messagesReceived"], 0);
        assert!(v["startTime"].is_i64());
        assert_eq!(v["logs"].as_array().map(Vec::len), Some(1));
    }
}
