use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use client_core::PollerConfig;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    /// `None` polls until a terminal status or Ctrl-C.
    pub max_poll_duration_secs: Option<u64>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            poll_interval_ms: 2000,
            max_poll_attempts: None,
            max_poll_duration_secs: Some(30 * 60),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
            max_duration: self.max_poll_duration_secs.map(Duration::from_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Reads `config_path` (or `dashboard.toml` when present) and the environment.
///
/// An explicitly named file must exist and parse; the default file is optional.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let file_cfg = match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<HashMap<String, toml::Value>>(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => fs::read_to_string(DEFAULT_CONFIG_FILE)
            .ok()
            .and_then(|raw| toml::from_str(&raw).ok())
            .unwrap_or_default(),
    };
    let file_cfg = file_cfg
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect();
    let env_cfg = std::env::vars().collect::<HashMap<_, _>>();
    Ok(resolve_settings(&file_cfg, &env_cfg))
}

/// Layers file values, then environment values, over the defaults.
pub fn resolve_settings(
    file_cfg: &HashMap<String, String>,
    env_cfg: &HashMap<String, String>,
) -> Settings {
    let mut settings = Settings::default();
    apply_layer(&mut settings, |key| file_cfg.get(key).cloned());

    if let Some(v) = env_cfg.get("RESEARCH_API_URL") {
        settings.api_base_url = v.clone();
    }
    apply_layer(&mut settings, |key| {
        env_cfg.get(&format!("APP__{}", key.to_uppercase())).cloned()
    });

    settings
}

fn apply_layer(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("api_base_url").filter(|v| !v.trim().is_empty()) {
        settings.api_base_url = v.trim().to_string();
    }
    if let Some(v) = lookup("poll_interval_ms").and_then(|v| v.parse().ok()) {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = lookup("max_poll_attempts").and_then(|v| limit(&v)) {
        settings.max_poll_attempts = v;
    }
    if let Some(v) = lookup("max_poll_duration_secs").and_then(|v| limit(&v)) {
        settings.max_poll_duration_secs = v;
    }
    if let Some(v) = lookup("request_timeout_secs").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
}

// "0" or "none" lifts the limit; anything unparsable is ignored.
fn limit<T: std::str::FromStr + PartialEq + Default>(raw: &str) -> Option<Option<T>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    let value: T = raw.parse().ok()?;
    Some((value != T::default()).then_some(value))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
