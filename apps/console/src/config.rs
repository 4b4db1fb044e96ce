use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, Context};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub session_url: String,
    pub log_filter: String,
    pub event_queue_capacity: usize,
    /// Send `set_prompt` + `start` whenever the session becomes ready.
    pub auto_start: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_url: "ws://127.0.0.1:8080/session".into(),
            log_filter: "info".into(),
            event_queue_capacity: 256,
            auto_start: false,
        }
    }
}

pub fn load_settings(config_path: &Path) -> Settings {
    let raw = fs::read_to_string(config_path).ok();
    load_settings_with(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the flat toml file, then environment variables.
fn load_settings_with(raw_file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            if let Some(v) = file_cfg.get("session_url") {
                settings.session_url = v.clone();
            }
            if let Some(v) = file_cfg.get("log_filter") {
                settings.log_filter = v.clone();
            }
            if let Some(v) = file_cfg.get("event_queue_capacity") {
                if let Ok(parsed) = v.parse::<usize>() {
                    settings.event_queue_capacity = parsed;
                }
            }
            if let Some(v) = file_cfg.get("auto_start") {
                if let Ok(parsed) = v.parse::<bool>() {
                    settings.auto_start = parsed;
                }
            }
        }
    }

    if let Some(v) = env("SESSION_URL") {
        settings.session_url = v;
    }
    if let Some(v) = env("APP__SESSION_URL") {
        settings.session_url = v;
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = env("APP__EVENT_QUEUE_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_queue_capacity = parsed;
        }
    }

    if let Some(v) = env("APP__AUTO_START") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.auto_start = parsed;
        }
    }

    // mpsc::channel panics on zero capacity.
    settings.event_queue_capacity = settings.event_queue_capacity.max(1);
    settings
}

pub fn normalize_session_url(raw_session_url: &str) -> anyhow::Result<String> {
    let raw_session_url = raw_session_url.trim();

    let ws_url = if let Some(rest) = raw_session_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = raw_session_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if raw_session_url.starts_with("ws://") || raw_session_url.starts_with("wss://") {
        raw_session_url.to_string()
    } else {
        return Err(anyhow!(
            "session_url must start with ws://, wss://, http:// or https://"
        ));
    };

    let parsed =
        Url::parse(&ws_url).with_context(|| format!("invalid session url '{raw_session_url}'"))?;
    if parsed.host_str().is_none() {
        return Err(anyhow!("session url '{raw_session_url}' has no host"));
    }
    Ok(ws_url)
}
