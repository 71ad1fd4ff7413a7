use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser)]
#[command(name = "wa-relay")]
#[command(about = "Relay chat messages to a webhook and send back its replies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.wa-relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the relay and its dashboard (HTTP + WebSocket push channel + transport event ingestion).
    Run {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.wa-relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Dashboard port (default: PORT env, then config, then 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Follow a running relay's live dashboard events in the terminal.
    Watch {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.wa-relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Push channel URL (default: ws://127.0.0.1:<port>/ws)
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("wa-relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_relay(config, port).await {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Watch { config, url }) => {
            if let Err(e) = run_watch(config, url).await {
                log::error!("watch failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_relay(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    config.dashboard.port = port.unwrap_or_else(|| lib::config::resolve_port(&config));
    log::info!(
        "starting relay dashboard on {}:{}",
        config.dashboard.bind,
        config.dashboard.port
    );
    lib::gateway::run_relay(config).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsPayload {
    messages_received: u64,
    replies_sent: u64,
    errors: u64,
}

/// One terminal line per push-channel frame; None for frames not worth printing.
fn format_frame(event: &lib::gateway::WsEvent) -> Option<String> {
    let payload = &event.payload;
    match event.event.as_str() {
        "log" => payload.as_str().map(str::to_string),
        "stats" => {
            let stats: StatsPayload = serde_json::from_value(payload.clone()).ok()?;
            Some(format!(
                "[stats] received={} replied={} errors={}",
                stats.messages_received, stats.replies_sent, stats.errors
            ))
        }
        "status" => {
            let ready = payload.get("ready").and_then(|v| v.as_bool()).unwrap_or(false);
            let authenticated = payload
                .get("authenticated")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            Some(format!("[status] ready={} authenticated={}", ready, authenticated))
        }
        "qr" => payload
            .as_str()
            .map(|code| format!("[qr] scan this pairing code: {}", code)),
        "shutdown" => Some("[shutdown] relay is stopping".to_string()),
        _ => None,
    }
}

async fn run_watch(
    config_path: Option<std::path::PathBuf>,
    url: Option<String>,
) -> Result<(), String> {
    let ws_url = match url {
        Some(u) => u,
        None => {
            let (config, _) = lib::config::load_config(config_path).map_err(|e| e.to_string())?;
            format!("ws://127.0.0.1:{}/ws", lib::config::resolve_port(&config))
        }
    };

    let (mut ws, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .map_err(|e| e.to_string())?;
    log::info!("connected to {}", ws_url);

    while let Some(msg) = ws.next().await {
        let msg = msg.map_err(|e| e.to_string())?;
        let Message::Text(text) = msg else { continue };
        let Ok(event) = serde_json::from_str::<lib::gateway::WsEvent>(&text) else {
            continue;
        };
        if let Some(line) = format_frame(&event) {
            println!("{}", line);
        }
        if event.event == "shutdown" {
            break;
        }
    }

    Ok(())
}
