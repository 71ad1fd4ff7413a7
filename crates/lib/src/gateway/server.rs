//! Dashboard HTTP + WebSocket server (single port).
//!
//! Also receives transport events from the chat-session bridge on `POST /transport/events`.

use crate::channels::{BridgeChannel, ChannelHandle, TransportEvent};
use crate::config::{self, Config};
use crate::gateway::page::{render_dashboard, PageView};
use crate::gateway::protocol::DashboardEvent;
use crate::relay::{Relay, RelaySettings, WebhookClient};
use crate::state::{RelayState, StatsSnapshot};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::{Html, Response},
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Header carrying the shared secret on transport event posts.
pub const TRANSPORT_SECRET_HEADER: &str = "X-Relay-Transport-Secret";

/// Shared state for the dashboard routes.
#[derive(Clone)]
pub struct DashboardState {
    pub relay: Relay,
    /// When Some, transport event posts must carry this value in the secret header.
    pub event_secret: Option<Arc<str>>,
}

impl DashboardState {
    pub fn new(relay: Relay, event_secret: Option<String>) -> Self {
        Self {
            relay,
            event_secret: event_secret
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(Arc::from),
        }
    }

    fn state(&self) -> &RelayState {
        self.relay.state()
    }
}

/// Routes: `/`, `/api/stats`, `/ws`, `/transport/events`.
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/stats", get(api_stats))
        .route("/ws", get(ws_handler))
        .route("/transport/events", post(transport_events))
        .with_state(state)
}

/// Run the relay and its dashboard; binds to config.dashboard.bind:config.dashboard.port.
/// Fails when no webhook URL is configured. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_relay(config: Config) -> Result<()> {
    let webhook_url = config::resolve_webhook_url(&config).context(
        "no webhook URL configured (set webhook.url in the config file or RELAY_WEBHOOK_URL)",
    )?;
    let bridge = BridgeChannel::new(config::resolve_transport_url(&config));
    log::info!("chat-session bridge at {}", bridge.base_url());
    let transport: Arc<dyn ChannelHandle> = Arc::new(bridge);
    let webhook = WebhookClient::new(webhook_url);
    log::info!("forwarding messages to webhook {}", webhook.url());
    let settings = RelaySettings::from_config(&config);
    let (delay_min, delay_max) = settings.reply_delay.bounds();
    log::info!("reply delay {}..={} ms", delay_min, delay_max);
    let state = RelayState::new();
    let relay = Relay::new(state.clone(), transport.clone(), webhook, settings);

    let bind_addr = format!("{}:{}", config.dashboard.bind.trim(), config.dashboard.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    state.info(format!("Dashboard: http://localhost:{}", config.dashboard.port));

    let dashboard = DashboardState::new(relay, config.transport.event_secret.clone());
    serve(listener, dashboard, shutdown_signal(state, transport)).await?;
    log::info!("relay stopped");
    Ok(())
}

/// Serve the dashboard on an already-bound listener until `shutdown` completes.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: DashboardState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("dashboard server exited")
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Pushes a shutdown event to dashboard clients and stops the transport. In-flight replies are abandoned.
async fn shutdown_signal(state: RelayState, transport: Arc<dyn ChannelHandle>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, notifying dashboard clients");
    state.publish(DashboardEvent::Shutdown);
    transport.stop();
}

/// GET / renders the current state.
async fn dashboard_page(State(state): State<DashboardState>) -> Html<String> {
    let relay_state = state.state();
    let snapshot = relay_state.snapshot();
    let qr = relay_state.last_qr();
    Html(render_dashboard(&PageView {
        snapshot: &snapshot,
        connection: relay_state.connection(),
        uptime: relay_state.uptime(),
        qr: qr.as_deref(),
    }))
}

/// GET /api/stats returns counters and recent logs.
async fn api_stats(State(state): State<DashboardState>) -> Json<StatsSnapshot> {
    Json(state.state().snapshot())
}

/// POST /transport/events: one transport event from the bridge. Checks the optional secret.
async fn transport_events(
    State(state): State<DashboardState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.event_secret {
        let provided = headers
            .get(TRANSPORT_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != &**expected {
            return StatusCode::FORBIDDEN;
        }
    }
    let event: TransportEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("rejecting transport event: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    // Message handling runs detached; the bridge is not kept waiting on the webhook.
    let _ = state.relay.handle_transport_event(event);
    StatusCode::ACCEPTED
}

/// GET /ws upgrades to the push channel.
async fn ws_handler(State(state): State<DashboardState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: DashboardState) {
    let relay_state = state.state().clone();
    let mut event_rx = relay_state.subscribe();

    let connection = relay_state.connection();
    let initial = DashboardEvent::Status(connection).to_frame();
    if socket.send(Message::Text(initial)).await.is_err() {
        return;
    }
    if !connection.ready {
        if let Some(code) = relay_state.last_qr() {
            if socket
                .send(Message::Text(DashboardEvent::Qr(code).to_frame()))
                .await
                .is_err()
            {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            biased;

            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        let is_shutdown = event == DashboardEvent::Shutdown;
                        if socket.send(Message::Text(event.to_frame())).await.is_err() {
                            break;
                        }
                        if is_shutdown {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::debug!("dashboard client lagged {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // Observers only listen; anything they send is ignored.
                    Some(Ok(_)) => continue,
                }
            }
        }
    }
    log::debug!("dashboard client disconnected");
}
