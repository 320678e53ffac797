//! Agent config loader (strict parsing).

pub mod schema;

use std::fs;

use meterline_core::error::{MeterlineError, Result};

pub use schema::{MeterlineConfig, MetricsSection, ServerSection, SessionsSection};

/// Environment variable consulted when `metrics.api_key` is left empty.
pub const API_KEY_ENV: &str = "METERLINE_API_KEY";

pub fn load_from_file(path: &str) -> Result<MeterlineConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MeterlineError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<MeterlineConfig> {
    let mut cfg: MeterlineConfig = serde_yaml::from_str(s)
        .map_err(|e| MeterlineError::BadRequest(format!("invalid yaml: {e}")))?;
    if cfg.metrics.api_key.is_empty() {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            cfg.metrics.api_key = key;
        }
    }
    cfg.validate()?;
    Ok(cfg)
}
