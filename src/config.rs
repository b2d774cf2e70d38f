use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::content::CareContent;
use crate::session::SessionConfig;
use crate::timeline::TimelineDelays;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_silence_gap_ms")]
    pub silence_gap_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_cm_line_delay_ms")]
    pub cm_line_delay_ms: u64,
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,
    #[serde(default = "default_injected_delay_ms")]
    pub injected_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentConfig {
    /// Replacement content document; the embedded defaults when unset
    pub path: Option<String>,
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_locale() -> String {
    "en-AU".to_string()
}

fn default_silence_gap_ms() -> u64 {
    2200
}

fn default_cm_line_delay_ms() -> u64 {
    4000
}

fn default_response_delay_ms() -> u64 {
    2500
}

fn default_injected_delay_ms() -> u64 {
    800
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            locale: default_locale(),
            silence_gap_ms: default_silence_gap_ms(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            cm_line_delay_ms: default_cm_line_delay_ms(),
            response_delay_ms: default_response_delay_ms(),
            injected_delay_ms: default_injected_delay_ms(),
        }
    }
}

impl Config {
    /// Load from a TOML file (extension optional) with `CLEARPATH__*`
    /// environment overrides, e.g. `CLEARPATH__SPEECH__NATS_URL`
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "clearpath-call")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 3100)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("CLEARPATH")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Content tables for all sessions
    pub fn load_content(&self) -> Result<CareContent> {
        match &self.content.path {
            Some(path) => CareContent::from_file(path)
                .with_context(|| format!("Failed to load content from {}", path)),
            None => CareContent::builtin().context("Embedded content is invalid"),
        }
    }

    /// Session settings shared by every call; callers fill in id, role and mode
    pub fn session_defaults(&self) -> SessionConfig {
        SessionConfig {
            delays: self.timeline.delays(),
            silence_gap: Duration::from_millis(self.speech.silence_gap_ms),
            locale: self.speech.locale.clone(),
            ..SessionConfig::default()
        }
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}

impl TimelineConfig {
    pub fn delays(&self) -> TimelineDelays {
        TimelineDelays {
            cm_line: Duration::from_millis(self.cm_line_delay_ms),
            response: Duration::from_millis(self.response_delay_ms),
            injected: Duration::from_millis(self.injected_delay_ms),
        }
    }
}
