use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    model::{WeatherRequest, WeatherSnapshot},
    provider::{ProviderError, http_client, truncate_body},
};

use super::WeatherProvider;

/// Visual Crossing timeline API: `{base}/{location}/{date}?key=...`.
#[derive(Clone)]
pub struct VisualCrossingProvider {
    api_key: String,
    base_url: Url,
    http: Client,
}

impl std::fmt::Debug for VisualCrossingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualCrossingProvider")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl VisualCrossingProvider {
    pub fn new(base_url: &str, api_key: String, timeout: Option<Duration>) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid weather base URL: {base_url}"))?;

        if parsed.cannot_be_a_base() {
            bail!("Invalid weather base URL: {base_url} cannot carry a path");
        }

        Ok(Self { api_key, base_url: parsed, http: http_client(timeout)? })
    }

    /// Location and date become percent-encoded path segments.
    fn timeline_url(&self, request: &WeatherRequest) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidBaseUrl)?
            .pop_if_empty()
            .push(&request.location)
            .push(&request.date.format("%Y-%m-%d").to_string());
        Ok(url)
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingProvider {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherSnapshot, ProviderError> {
        let url = self.timeline_url(request)?;

        info!(location = %request.location, date = %request.date, "requesting weather timeline");

        let res = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = res.status();

        if !status.is_success() {
            // The status is what the caller needs; an unreadable body degrades to empty.
            let body = res.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %truncate_body(&body),
                "weather provider request failed"
            );
            return Err(ProviderError::Upstream { status: status.as_u16(), body });
        }

        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
