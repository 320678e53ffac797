use std::time::Duration;

use serde::Deserialize;
use meterline_core::error::{MeterlineError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeterlineConfig {
    pub version: u32,

    pub metrics: MetricsSection,

    #[serde(default)]
    pub sessions: SessionsSection,

    #[serde(default)]
    pub server: ServerSection,
}

impl MeterlineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MeterlineError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.metrics.validate()?;
        self.sessions.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Value of the `source` attribute on every data point.
    pub source: String,

    /// OTLP/HTTP ingestion endpoint.
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(MeterlineError::BadRequest(
                "metrics.source must not be empty".into(),
            ));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(MeterlineError::BadRequest(
                "metrics.url must be an http(s) URL".into(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(MeterlineError::BadRequest(
                "metrics.api_key must be set (or METERLINE_API_KEY)".into(),
            ));
        }
        if !(1000..=300000).contains(&self.flush_interval_ms) {
            return Err(MeterlineError::BadRequest(
                "metrics.flush_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        if !(100..=60000).contains(&self.push_timeout_ms) {
            return Err(MeterlineError::BadRequest(
                "metrics.push_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.push_timeout_ms >= self.flush_interval_ms {
            return Err(MeterlineError::BadRequest(
                "metrics.push_timeout_ms must be less than flush_interval_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsSection {
    /// How long a user stays active after their last `mark_user_active`.
    #[serde(default = "default_expiry_ms")]
    pub expiry_ms: u64,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            expiry_ms: default_expiry_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl SessionsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=86_400_000).contains(&self.expiry_ms) {
            return Err(MeterlineError::BadRequest(
                "sessions.expiry_ms must be between 1000 and 86400000".into(),
            ));
        }
        if !(1000..=300000).contains(&self.sweep_interval_ms) {
            return Err(MeterlineError::BadRequest(
                "sessions.sweep_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        Ok(())
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_flush_interval_ms() -> u64 {
    10000
}
fn default_push_timeout_ms() -> u64 {
    5000
}
fn default_expiry_ms() -> u64 {
    180000
}
fn default_sweep_interval_ms() -> u64 {
    10000
}
fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
