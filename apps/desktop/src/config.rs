use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{
    config::{DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT},
    ClientConfig,
};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `path` if it exists, then environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["FEEDBACK_API_BASE_URL", "APP__API_BASE_URL"] {
        if let Some(v) = lookup(key) {
            settings.api_base_url = v;
        }
    }

    for key in ["FEEDBACK_POLL_INTERVAL_MS", "APP__POLL_INTERVAL_MS"] {
        if let Some(parsed) = lookup(key).and_then(|v| v.parse::<u64>().ok()) {
            settings.poll_interval_ms = parsed;
        }
    }

    if let Some(parsed) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok())
    {
        settings.request_timeout_secs = parsed;
    }
}

impl Settings {
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll interval must be greater than zero");
        }
        let config = ClientConfig::new(self.api_base_url.clone())
            .with_context(|| format!("invalid api base url '{}'", self.api_base_url))?
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs));
        Ok(config)
    }
}
