//! Remote delivery of unprocessed annotation batches.
//!
//! The sink is a trait so the reconcile flow can be exercised against an
//! in-memory double; the production implementation posts the export
//! payload as JSON with a bearer token.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SyncConfig;
use crate::error::{CodemarksError, Result};
use crate::models::ExportPayload;

/// Delivers one export payload to a remote endpoint. `deliver` must only
/// return `Ok` when the remote acknowledged the batch.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn deliver(&self, payload: &ExportPayload) -> Result<()>;
}

/// HTTP sink: POST the payload to the configured endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSink {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CodemarksError::RemoteSink(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl RemoteSink for HttpSink {
    async fn deliver(&self, payload: &ExportPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| CodemarksError::RemoteSink(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CodemarksError::RemoteSink(format!(
                "request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(())
    }
}
