//! Initialize the configuration directory: create ~/.wa-relay and a default config file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Create the config directory and default config file if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `{}` if the file is missing, so every setting takes its built-in default; an existing file is left alone.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;

    #[test]
    fn writes_loadable_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");
        let config_dir = init_config_dir(&path).expect("init");
        assert_eq!(config_dir, dir.path().join("nested"));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "{}");
        let (config, _) = load_config(Some(path)).expect("load");
        assert_eq!(config.dashboard.port, 3000);
        assert_eq!(config.relay.reply_delay_max_ms, 4000);
    }

    #[test]
    fn existing_config_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"webhook":{"url":"https://hooks.example.com/x"}}"#)
            .expect("write");
        init_config_dir(&path).expect("init");
        let (config, _) = load_config(Some(path)).expect("load");
        assert_eq!(config.webhook.url.as_deref(), Some("https://hooks.example.com/x"));
    }
}
