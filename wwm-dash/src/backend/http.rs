//! HTTP implementation of the backend request surface

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use wwm_common::api::{CorrectionRequest, RecordPayload, StatsEnvelope};
use wwm_common::config::DashConfig;
use wwm_common::model::{AggregateStats, ClassificationRecord, RecordId, Verdict};
use wwm_common::{Error, Result};

use super::Backend;
use crate::snapshot::normalize_history;

const USER_AGENT: &str = concat!("wwm-dash/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed backend client
///
/// Every request is bounded by the configured timeout; expiry surfaces as
/// [`Error::Timeout`].
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: DashConfig,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a client for the configured backend
    pub fn new(config: &DashConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
            timeout: config.request_timeout(),
        })
    }

    /// Base URL used to resolve image references
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.timeout.as_millis() as u64)
        } else {
            Error::transport(format!("{url}: {e}"))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Backend returned error status");
            return Err(Error::status(
                status.as_u16(),
                format!("HTTP {} from {}: {}", status.as_u16(), url, body.trim()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::MalformedPayload(format!("{url}: {e}")))
    }

    /// Fetch and normalize the classification log
    pub async fn fetch_history(&self) -> Result<Vec<ClassificationRecord>> {
        let url = self.config.api_url("/history");
        debug!(url = %url, "Loading history snapshot");
        let payloads: Vec<RecordPayload> = self.send_json(self.client.get(&url), &url).await?;
        normalize_history(&self.config.base_url, payloads)
    }

    /// Fetch the aggregate statistics
    pub async fn fetch_stats(&self) -> Result<AggregateStats> {
        let url = self.config.api_url("/stats");
        debug!(url = %url, "Loading stats snapshot");
        let envelope: StatsEnvelope = self.send_json(self.client.get(&url), &url).await?;
        envelope.into_stats()
    }

    /// Post a verdict and return the backend's canonical record
    pub async fn post_correction(
        &self,
        id: RecordId,
        verdict: Verdict,
    ) -> Result<ClassificationRecord> {
        let url = self.config.api_url(&format!("/log/{id}/correction"));
        debug!(url = %url, %verdict, "Submitting correction");
        let request = self.client.post(&url).json(&CorrectionRequest { verdict });
        let payload: RecordPayload = self.send_json(request, &url).await?;
        if payload.id != id {
            return Err(Error::MalformedPayload(format!(
                "correction for {id} answered with record {}",
                payload.id
            )));
        }
        payload.into_record(&self.config.base_url)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn load_history(&self) -> Result<Vec<ClassificationRecord>> {
        self.fetch_history().await
    }

    async fn load_stats(&self) -> Result<AggregateStats> {
        self.fetch_stats().await
    }

    async fn submit_correction(
        &self,
        id: RecordId,
        verdict: Verdict,
    ) -> Result<ClassificationRecord> {
        self.post_correction(id, verdict).await
    }
}
