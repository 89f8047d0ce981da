use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use tracing::warn;
use url::Url;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);
const DEFAULT_CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Base of the REST collaborators, e.g. `http://localhost:8000/api/chat`.
    pub api_base_url: String,
    /// Base of the socket endpoint; `/ws/chat/` is appended.
    pub ws_base_url: String,
    pub reconnect_delay: Duration,
    pub event_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/chat".into(),
            ws_base_url: "ws://localhost:8000".into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            event_buffer: 1024,
        }
    }
}

impl ClientSettings {
    /// Full socket url for a session token.
    pub fn chat_endpoint(&self, token: &str) -> Result<Url, url::ParseError> {
        let base = self.ws_base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/ws/chat/"))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "api_base_url" => self.api_base_url = value.to_string(),
            "ws_base_url" => self.ws_base_url = value.to_string(),
            "reconnect_delay_ms" => match value.parse::<u64>() {
                Ok(ms) => self.reconnect_delay = Duration::from_millis(ms),
                Err(err) => warn!(value, "ignoring invalid reconnect_delay_ms: {err}"),
            },
            "event_buffer" => match value.parse::<usize>() {
                Ok(size) if size > 0 => self.event_buffer = size,
                _ => warn!(value, "ignoring invalid event_buffer"),
            },
            other => warn!(key = other, "ignoring unknown client setting"),
        }
    }
}

/// Defaults, then `client.toml` in the working directory, then the environment.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Err(err) = apply_file(&mut settings, Path::new(DEFAULT_CONFIG_FILE)) {
        warn!("failed to read {DEFAULT_CONFIG_FILE}: {err:#}");
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// Overlays a `key = "value"` toml file. A missing file is not an error.
pub fn apply_file(settings: &mut ClientSettings, path: &Path) -> anyhow::Result<()> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;
    for (key, value) in file_cfg {
        let value = match value {
            toml::Value::String(s) => s,
            other => other.to_string(),
        };
        settings.apply(&key, &value);
    }
    Ok(())
}

pub fn apply_env(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    const VARS: &[(&str, &str)] = &[
        ("CHAT_API_URL", "api_base_url"),
        ("APP__API_BASE_URL", "api_base_url"),
        ("CHAT_WS_URL", "ws_base_url"),
        ("APP__WS_BASE_URL", "ws_base_url"),
        ("CHAT_RECONNECT_DELAY_MS", "reconnect_delay_ms"),
        ("APP__RECONNECT_DELAY_MS", "reconnect_delay_ms"),
        ("APP__EVENT_BUFFER", "event_buffer"),
    ];
    for (var, key) in VARS {
        if let Some(value) = lookup(var) {
            settings.apply(key, &value);
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
