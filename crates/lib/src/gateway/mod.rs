//! Dashboard: HTTP + WebSocket observation surface for the relay.
//!
//! Single port serves the HTML page, the JSON snapshot, the push channel and transport event ingestion.
//! No authentication; every observer sees the same global state.

mod page;
mod protocol;
mod server;

pub use page::{escape_html, render_dashboard, PageView};
pub use protocol::{DashboardEvent, WsEvent};
pub use server::{router, run_relay, serve, DashboardState, TRANSPORT_SECRET_HEADER};
