//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.wa-relay/config.json`) and environment.
//! Every field has a default so a missing file still yields a runnable relay once a webhook URL is known.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Dashboard server settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// External webhook that processes forwarded messages.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Relay behaviour (scratch dir, reply delay).
    #[serde(default)]
    pub relay: RelayConfig,

    /// Chat-session bridge the relay talks to.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Dashboard bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Port for HTTP, the push channel and transport event ingestion (default 3000). Overridden by PORT env.
    #[serde(default = "default_dashboard_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_dashboard_bind")]
    pub bind: String,
}

fn default_dashboard_port() -> u16 {
    3000
}

fn default_dashboard_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_dashboard_port(),
            bind: default_dashboard_bind(),
        }
    }
}

/// Webhook endpoint. A single fixed URL; no auth, no timeout, no retry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Overridden by RELAY_WEBHOOK_URL env when set.
    pub url: Option<String>,
}

/// Relay tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Scratch directory for voice uploads. Relative paths resolve against the working directory.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Lower bound of the randomized reply delay, in milliseconds (inclusive).
    #[serde(default = "default_reply_delay_min_ms")]
    pub reply_delay_min_ms: u64,

    /// Upper bound of the randomized reply delay, in milliseconds (inclusive).
    #[serde(default = "default_reply_delay_max_ms")]
    pub reply_delay_max_ms: u64,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_reply_delay_min_ms() -> u64 {
    2000
}

fn default_reply_delay_max_ms() -> u64 {
    4000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            reply_delay_min_ms: default_reply_delay_min_ms(),
            reply_delay_max_ms: default_reply_delay_max_ms(),
        }
    }
}

/// Chat-session bridge settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    /// Bridge base URL (default http://127.0.0.1:3001). Overridden by RELAY_TRANSPORT_URL env.
    pub base_url: Option<String>,
    /// When set, POST /transport/events must carry this value in X-Relay-Transport-Secret.
    pub event_secret: Option<String>,
}

const DEFAULT_TRANSPORT_URL: &str = "http://127.0.0.1:3001";

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the webhook URL: env RELAY_WEBHOOK_URL overrides config.
pub fn resolve_webhook_url(config: &Config) -> Option<String> {
    non_empty_env("RELAY_WEBHOOK_URL").or_else(|| {
        config
            .webhook
            .url
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the dashboard port: env PORT overrides config when it parses.
pub fn resolve_port(config: &Config) -> u16 {
    match non_empty_env("PORT").map(|p| p.parse::<u16>()) {
        Some(Ok(port)) => port,
        Some(Err(_)) => {
            log::warn!("ignoring unparsable PORT env, using {}", config.dashboard.port);
            config.dashboard.port
        }
        None => config.dashboard.port,
    }
}

/// Resolve the chat-session bridge URL: env RELAY_TRANSPORT_URL overrides config.
pub fn resolve_transport_url(config: &Config) -> String {
    non_empty_env("RELAY_TRANSPORT_URL")
        .or_else(|| {
            config
                .transport
                .base_url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_TRANSPORT_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".wa-relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or RELAY_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = read_config(&path)?;
    Ok((config, path))
}

fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing config from {}", path.display()))
}
