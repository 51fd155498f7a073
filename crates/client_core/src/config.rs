use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_CONFIG_FILE: &str = "blog_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub event_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 10,
            event_buffer: 64,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    event_buffer: Option<usize>,
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL with a trailing slash so endpoint paths join underneath any
    /// path prefix instead of replacing it.
    pub fn base_url(&self) -> Result<Url, ClientError> {
        parse_server_url(&self.server_url)
    }

    pub fn set_server_url(&mut self, raw: &str, source: &str) {
        match parse_server_url(raw) {
            Ok(_) => self.server_url = raw.trim().to_string(),
            Err(err) => warn!(source, value = raw, "ignoring server url: {err}"),
        }
    }
}

/// Defaults, then the config file (`blog_client.toml` unless a path is given),
/// then the process environment.
pub fn load_settings(config_path: Option<&Path>) -> ClientSettings {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let raw = match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) => {
            if config_path.is_some() {
                warn!(path = %path.display(), "could not read config file: {err}");
            }
            None
        }
    };
    settings_from_sources(raw.as_deref(), |key| std::env::var(key).ok())
}

pub fn settings_from_sources(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Some(raw) = file_contents {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.server_url {
                    settings.set_server_url(&v, "config file");
                }
                if let Some(v) = file_cfg.request_timeout_secs {
                    apply_timeout(&mut settings, v, "config file");
                }
                if let Some(v) = file_cfg.event_buffer {
                    apply_event_buffer(&mut settings, v, "config file");
                }
            }
            Err(err) => warn!("ignoring unparsable config file: {err}"),
        }
    }

    if let Some(v) = env("BLOG_SERVER_URL") {
        settings.set_server_url(&v, "BLOG_SERVER_URL");
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.set_server_url(&v, "APP__SERVER_URL");
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(parsed) => apply_timeout(&mut settings, parsed, "APP__REQUEST_TIMEOUT_SECS"),
            Err(err) => warn!(value = %v, "ignoring APP__REQUEST_TIMEOUT_SECS: {err}"),
        }
    }
    if let Some(v) = env("APP__EVENT_BUFFER") {
        match v.trim().parse::<usize>() {
            Ok(parsed) => apply_event_buffer(&mut settings, parsed, "APP__EVENT_BUFFER"),
            Err(err) => warn!(value = %v, "ignoring APP__EVENT_BUFFER: {err}"),
        }
    }

    settings
}

fn apply_timeout(settings: &mut ClientSettings, secs: u64, source: &str) {
    if secs == 0 {
        warn!(source, "ignoring zero request timeout");
        return;
    }
    settings.request_timeout_secs = secs;
}

fn apply_event_buffer(settings: &mut ClientSettings, capacity: usize, source: &str) {
    // broadcast::channel panics on zero capacity
    if capacity == 0 {
        warn!(source, "ignoring zero event buffer");
        return;
    }
    settings.event_buffer = capacity;
}

pub fn parse_server_url(raw: &str) -> Result<Url, ClientError> {
    let raw = raw.trim();
    let mut url = Url::parse(raw)
        .map_err(|err| ClientError::Validation(format!("invalid server url '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Validation(format!(
            "server url '{raw}' must use http or https"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
