use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use meterline_core::error::{MeterlineError, Result};
use meterline_core::protocol::otlp::MetricsRequest;

/// Destination for encoded metric envelopes.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Deliver one envelope. Any non-2xx answer is an error.
    async fn push(&self, req: &MetricsRequest) -> Result<()>;
}

/// OTLP/HTTP JSON endpoint with bearer-token auth.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeterlineError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl MetricSink for HttpSink {
    async fn push(&self, req: &MetricsRequest) -> Result<()> {
        let body = req.to_json()?;
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MeterlineError::Timeout
                } else {
                    MeterlineError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MeterlineError::Status(status.as_u16()));
        }
        Ok(())
    }
}
