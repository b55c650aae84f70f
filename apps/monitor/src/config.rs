use std::{collections::HashMap, fs, path::Path};

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    /// Both halves of the remote endpoint, once configured.
    pub fn endpoint(&self) -> Option<(String, u16)> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        Some((host.to_string(), self.port?))
    }

    fn set_port(&mut self, source: &str, raw: &str) {
        match raw.trim().parse::<u16>() {
            Ok(port) => self.port = Some(port),
            Err(err) => warn!(source, value = raw, %err, "config: ignoring unparseable port"),
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(%err, "config: ignoring unreadable config file");
            return;
        }
    };

    if let Some(v) = file_cfg.get("host").and_then(toml::Value::as_str) {
        settings.host = Some(v.to_string());
    }
    match file_cfg.get("port") {
        Some(toml::Value::Integer(port)) => match u16::try_from(*port) {
            Ok(port) => settings.port = Some(port),
            Err(err) => warn!(value = port, %err, "config: ignoring unparseable port"),
        },
        Some(toml::Value::String(port)) => settings.set_port("file", port),
        _ => {}
    }
    if let Some(v) = file_cfg.get("log_filter").and_then(toml::Value::as_str) {
        settings.log_filter = v.to_string();
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("READINESS_HOST") {
        settings.host = Some(v);
    }
    if let Some(v) = lookup("APP__HOST") {
        settings.host = Some(v);
    }

    if let Some(v) = lookup("READINESS_PORT") {
        settings.set_port("READINESS_PORT", &v);
    }
    if let Some(v) = lookup("APP__PORT") {
        settings.set_port("APP__PORT", &v);
    }

    if let Some(v) = lookup("READINESS_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
