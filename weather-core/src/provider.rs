use crate::{
    Config, Credentials, WeatherRequest, error::ApiError, model::WeatherSnapshot,
    provider::visualcrossing::VisualCrossingProvider,
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc, time::Duration};

pub mod visualcrossing;

/// Why a weather lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("weather provider responded with status {status}")]
    Upstream { status: u16, body: String },

    #[error("failed to reach weather provider: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse weather provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("weather base URL cannot carry path segments")]
    InvalidBaseUrl,
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Upstream { status, body } => ApiError::upstream(status, body),
            other => ApiError::bad_gateway(other.to_string()),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherSnapshot, ProviderError>;
}

/// Construct the weather provider from config and resolved credentials.
pub fn provider_from_config(
    config: &Config,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider = VisualCrossingProvider::new(
        &config.weather.base_url,
        credentials.weather_api_key.clone(),
        config.http.timeout(),
    )?;

    Ok(Arc::new(provider))
}

/// Shared HTTP client setup; no timeout unless one is configured.
pub(crate) fn http_client(timeout: Option<Duration>) -> anyhow::Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}

/// Shorten an upstream body for log lines.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
