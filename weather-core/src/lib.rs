//! Core library for the weather recommendation service.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider and recommendation clients
//! - Unit conversion and hourly sampling
//! - The request handler that ties them together
//!
//! It has no inbound HTTP dependency; `weather-server` adapts [`Handler`] onto routes.

pub mod config;
pub mod error;
pub mod forecast;
pub mod handler;
pub mod model;
pub mod provider;
pub mod recommender;

#[cfg(test)]
mod test_support;

pub use config::{Config, Credentials};
pub use error::{ApiError, ErrorKind};
pub use handler::Handler;
pub use model::{ResponseDocument, WeatherRequest, WeatherSummary};
pub use provider::{ProviderError, WeatherProvider};
pub use recommender::Recommender;

/// Build a [`Handler`] wired to the real providers described by `config`.
pub fn handler_from_config(config: &Config) -> anyhow::Result<Handler> {
    let credentials = config.credentials()?;
    let weather = provider::provider_from_config(config, &credentials)?;
    let recommender = recommender::recommender_from_config(config, &credentials)?;

    Ok(Handler::new(credentials.api_token, weather, recommender))
}
