//! Dashboard HTML page: server-side snapshot plus a script that follows the push channel.

use crate::state::{ConnectionState, StatsSnapshot};

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn status_text(connection: ConnectionState) -> &'static str {
    if connection.ready {
        "Running"
    } else if connection.authenticated {
        "Authenticated"
    } else {
        "Connecting..."
    }
}

/// Inputs for one page render, taken at request time.
pub struct PageView<'a> {
    pub snapshot: &'a StatsSnapshot,
    pub connection: ConnectionState,
    pub uptime: (i64, i64),
    /// Pending pairing code, shown while the transport is not ready.
    pub qr: Option<&'a str>,
}

const STYLE: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; padding: 20px; }
    .container { max-width: 1200px; margin: 0 auto; }
    .card { background: white; border-radius: 12px; padding: 24px; margin-bottom: 20px; box-shadow: 0 4px 6px rgba(0,0,0,0.1); }
    h1 { color: #333; margin-bottom: 8px; }
    .status { display: inline-flex; align-items: center; gap: 8px; padding: 8px 16px; background: #10b981; color: white; border-radius: 20px; font-size: 14px; margin: 12px 0; }
    .status-dot { width: 8px; height: 8px; background: white; border-radius: 50%; }
    .stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 16px; }
    .stat-item { background: #f3f4f6; padding: 16px; border-radius: 8px; }
    .stat-number { font-size: 32px; font-weight: bold; color: #667eea; }
    .stat-label { color: #6b7280; font-size: 14px; margin-top: 4px; }
    .buttons { display: flex; gap: 12px; flex-wrap: wrap; }
    button { padding: 12px 24px; border: none; border-radius: 8px; font-size: 16px; cursor: pointer; font-weight: 500; }
    .btn-primary { background: #667eea; color: white; }
    .btn-success { background: #10b981; color: white; }
    .logs { background: #1e293b; color: #10b981; padding: 16px; border-radius: 8px; height: 300px; overflow-y: auto; font-family: 'Courier New', monospace; font-size: 13px; line-height: 1.6; }
    .log-entry { margin-bottom: 4px; }
    .qr-container { text-align: center; padding: 20px; }
    .qr-container img { max-width: 100%; height: auto; }
"#;

const SCRIPT: &str = r#"
    function statusText(s) {
      if (s.ready) return 'Running';
      if (s.authenticated) return 'Authenticated';
      return 'Connecting...';
    }
    function showQr(code) {
      document.getElementById('qr-section').style.display = 'block';
      document.getElementById('qr-image').src =
        'https://api.qrserver.com/v1/create-qr-code/?size=300x300&data=' + encodeURIComponent(code);
    }
    function connect() {
      const proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
      const ws = new WebSocket(proto + location.host + '/ws');
      ws.onmessage = (msg) => {
        const frame = JSON.parse(msg.data);
        const p = frame.payload;
        if (frame.event === 'log') {
          const logsDiv = document.getElementById('logs');
          const entry = document.createElement('div');
          entry.className = 'log-entry';
          entry.textContent = p;
          logsDiv.appendChild(entry);
          logsDiv.scrollTop = logsDiv.scrollHeight;
        } else if (frame.event === 'stats') {
          document.getElementById('received').textContent = p.messagesReceived;
          document.getElementById('sent').textContent = p.repliesSent;
          document.getElementById('errors').textContent = p.errors;
        } else if (frame.event === 'status') {
          document.getElementById('status-text').textContent = statusText(p);
          if (p.ready) document.getElementById('qr-section').style.display = 'none';
        } else if (frame.event === 'qr') {
          showQr(p);
        }
      };
      ws.onclose = () => setTimeout(connect, 3000);
    }
    function clearLogs() {
      document.getElementById('logs').innerHTML = '';
    }
    setInterval(() => {
      fetch('/api/stats')
        .then(r => r.json())
        .then(data => {
          const uptime = Math.floor((Date.now() - data.startTime) / 1000);
          const hours = Math.floor(uptime / 3600);
          const minutes = Math.floor((uptime % 3600) / 60);
          document.getElementById('uptime').textContent = hours + 'h ' + minutes + 'm';
        });
    }, 60000);
    connect();
"#;

/// Render the full dashboard page.
pub fn render_dashboard(view: &PageView<'_>) -> String {
    let stats = &view.snapshot.stats;
    let (hours, minutes) = view.uptime;
    let logs: String = view
        .snapshot
        .logs
        .iter()
        .map(|line| format!(r#"<div class="log-entry">{}</div>"#, escape_html(line)))
        .collect();
    let (qr_display, qr_src) = match view.qr {
        Some(code) if !view.connection.ready => (
            "block",
            format!(
                "https://api.qrserver.com/v1/create-qr-code/?size=300x300&amp;data={}",
                escape_html(&urlencoding::encode(code))
            ),
        ),
        _ => ("none", String::new()),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>WhatsApp Relay Dashboard</title>
  <style>{style}</style>
</head>
<body>
  <div class="container">
    <div class="card">
      <h1>WhatsApp Relay Dashboard</h1>
      <div class="status">
        <span class="status-dot"></span>
        <span id="status-text">{status}</span>
      </div>
      <p style="color: #6b7280;">Uptime: <span id="uptime">{hours}h {minutes}m</span></p>
    </div>
    <div class="card">
      <h2 style="margin-bottom: 16px;">Statistics</h2>
      <div class="stats-grid">
        <div class="stat-item">
          <div class="stat-number" id="received">{received}</div>
          <div class="stat-label">Messages Received</div>
        </div>
        <div class="stat-item">
          <div class="stat-number" id="sent">{sent}</div>
          <div class="stat-label">Replies Sent</div>
        </div>
        <div class="stat-item">
          <div class="stat-number" id="errors">{errors}</div>
          <div class="stat-label">Errors</div>
        </div>
      </div>
    </div>
    <div class="card">
      <h2 style="margin-bottom: 16px;">Controls</h2>
      <div class="buttons">
        <button class="btn-success" onclick="location.reload()">Refresh</button>
        <button class="btn-primary" onclick="clearLogs()">Clear Logs</button>
      </div>
    </div>
    <div class="card">
      <h2 style="margin-bottom: 16px;">Live Logs</h2>
      <div class="logs" id="logs">{logs}</div>
    </div>
    <div class="card" id="qr-section" style="display: {qr_display};">
      <h2 style="margin-bottom: 16px;">Scan QR Code</h2>
      <div class="qr-container">
        <img id="qr-image" src="{qr_src}" alt="QR Code">
      </div>
    </div>
  </div>
  <script>{script}</script>
</body>
</html>"#,
        style = STYLE,
        status = status_text(view.connection),
        hours = hours,
        minutes = minutes,
        received = stats.messages_received,
        sent = stats.replies_sent,
        errors = stats.errors,
        logs = logs,
        qr_display = qr_display,
        qr_src = qr_src,
        script = SCRIPT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Stats;

    fn snapshot(logs: Vec<&str>) -> StatsSnapshot {
        StatsSnapshot {
            stats: Stats {
                messages_received: 7,
                replies_sent: 5,
                errors: 2,
                start_time: 0,
            },
            logs: logs.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn renders_counters_uptime_and_status() {
        let snap = snapshot(vec!["10:00:00 Bot is ready!"]);
        let html = render_dashboard(&PageView {
            snapshot: &snap,
            connection: ConnectionState {
                ready: true,
                authenticated: true,
            },
            uptime: (3, 25),
            qr: None,
        });
        assert!(html.contains(r#"<div class="stat-number" id="received">7</div>"#));
        assert!(html.contains(r#"<div class="stat-number" id="sent">5</div>"#));
        assert!(html.contains(r#"<div class="stat-number" id="errors">2</div>"#));
        assert!(html.contains(r#"<span id="uptime">3h 25m</span>"#));
        assert!(html.contains(r#"<span id="status-text">Running</span>"#));
        assert!(html.contains(r#"<div class="log-entry">10:00:00 Bot is ready!</div>"#));
        assert!(html.contains(r#"id="qr-section" style="display: none;""#));
    }

    #[test]
    fn log_lines_are_escaped() {
        let snap = snapshot(vec!["10:00:00 Text: <script>alert(1)</script>"]);
        let html = render_dashboard(&PageView {
            snapshot: &snap,
            connection: ConnectionState::default(),
            uptime: (0, 0),
            qr: None,
        });
        assert!(html.contains("Text: &lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
    }

    #[test]
    fn pending_qr_is_shown_until_ready() {
        let snap = snapshot(vec![]);
        let html = render_dashboard(&PageView {
            snapshot: &snap,
            connection: ConnectionState::default(),
            uptime: (0, 1),
            qr: Some("2@ab/c+d=="),
        });
        assert!(html.contains(r#"id="qr-section" style="display: block;""#));
        assert!(html.contains("data=2%40ab%2Fc%2Bd%3D%3D"));
        assert!(html.contains("Connecting..."));
    }

    #[test]
    fn qr_code_is_encoded_as_query_value() {
        let snap = snapshot(vec![]);
        let html = render_dashboard(&PageView {
            snapshot: &snap,
            connection: ConnectionState::default(),
            uptime: (0, 0),
            qr: Some("a b&c<d>"),
        });
        assert!(html.contains("data=a%20b%26c%3Cd%3E\""));
        assert!(!html.contains("a b&c"));
    }
}
