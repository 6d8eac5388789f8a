use crate::{
    Config, Credentials, model::WeatherSummary, recommender::mistral::MistralRecommender,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod mistral;

/// Produces free-form activity advice for the day's weather.
///
/// Never fails: any problem talking to the model is reported inside the
/// returned text so the weather part of the response still reaches the caller.
#[async_trait]
pub trait Recommender: Send + Sync + Debug {
    async fn recommend(&self, weather: &WeatherSummary) -> String;
}

/// Prompt sent to the language model.
pub fn activity_prompt(weather: &WeatherSummary) -> String {
    format!(
        "What outdoor activities do you recommend, based on this weather: \
         Temperature: {:.1}°C, \
         Wind speed: {} km/h, \
         Humidity: {}%, \
         Pressure: {} mb. \
         Answer shortly with few sentences.",
        weather.temp_c,
        or_unknown(weather.wind_kph),
        or_unknown(weather.humidity),
        or_unknown(weather.pressure_mb),
    )
}

fn or_unknown(value: Option<f64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

pub fn recommender_from_config(
    config: &Config,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn Recommender>> {
    let recommender = MistralRecommender::new(
        config.recommender.clone(),
        credentials.recommender_api_key.clone(),
        config.http.timeout(),
    )?;

    Ok(Arc::new(recommender))
}
