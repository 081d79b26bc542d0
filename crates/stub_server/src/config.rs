use std::{collections::HashMap, fs, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub stage_delay_ms: u64,
    /// Features whose name contains this marker end in the `failed` status.
    pub failure_marker: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            stage_delay_ms: 1500,
            failure_marker: Some("fail".into()),
        }
    }
}

impl Settings {
    pub fn stage_delay(&self) -> Duration {
        Duration::from_millis(self.stage_delay_ms)
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string("stub_server.toml")
        .ok()
        .and_then(|raw| toml::from_str::<HashMap<String, String>>(&raw).ok())
        .unwrap_or_default();
    let env_cfg = std::env::vars().collect::<HashMap<_, _>>();
    resolve_settings(&file_cfg, &env_cfg)
}

/// Layers file values, then environment values, over the defaults.
pub fn resolve_settings(
    file_cfg: &HashMap<String, String>,
    env_cfg: &HashMap<String, String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("stage_delay_ms").and_then(|v| v.parse().ok()) {
        settings.stage_delay_ms = v;
    }
    if let Some(v) = file_cfg.get("failure_marker") {
        settings.failure_marker = non_empty(v);
    }

    if let Some(v) = env_cfg.get("STUB_SERVER_BIND") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = env_cfg.get("APP__BIND_ADDR") {
        settings.server_bind = v.clone();
    }

    if let Some(v) = env_cfg
        .get("APP__STAGE_DELAY_MS")
        .and_then(|v| v.parse().ok())
    {
        settings.stage_delay_ms = v;
    }

    if let Some(v) = env_cfg.get("APP__FAILURE_MARKER") {
        settings.failure_marker = non_empty(v);
    }

    settings
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
