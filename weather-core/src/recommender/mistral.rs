use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    config::RecommenderConfig,
    model::WeatherSummary,
    provider::{http_client, truncate_body},
    recommender::activity_prompt,
};

use super::Recommender;

/// Returned when the model answered but produced no message content.
pub const NO_RECOMMENDATIONS: &str = "No recommendations generated.";

/// Chat-completions client (Mistral wire format).
#[derive(Clone)]
pub struct MistralRecommender {
    settings: RecommenderConfig,
    url: Url,
    api_key: String,
    http: Client,
}

impl std::fmt::Debug for MistralRecommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralRecommender")
            .field("url", &self.url.as_str())
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
enum CompletionError {
    #[error("{status}, {body}")]
    Status { status: u16, body: String },

    #[error("request failed, {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body, {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl MistralRecommender {
    pub fn new(settings: RecommenderConfig, api_key: String, timeout: Option<Duration>) -> Result<Self> {
        let url = Url::parse(&settings.url)
            .with_context(|| format!("Invalid recommender URL: {}", settings.url))?;

        // The key lives in `api_key` only.
        let settings = RecommenderConfig { api_key: None, ..settings };

        Ok(Self { settings, url, api_key, http: http_client(timeout)? })
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let payload = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            max_tokens: self.settings.max_tokens,
        };

        info!(model = %self.settings.model, "requesting activity recommendation");

        let res = self
            .http
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status != StatusCode::OK {
            return Err(CompletionError::Status { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_else(|| NO_RECOMMENDATIONS.to_string()))
    }
}

#[async_trait]
impl Recommender for MistralRecommender {
    async fn recommend(&self, weather: &WeatherSummary) -> String {
        let prompt = activity_prompt(weather);

        match self.complete(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %truncate_body(&err.to_string()), "recommendation degraded");
                format!("Error: {err}")
            }
        }
    }
}
