use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_WEATHER_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";
pub const DEFAULT_RECOMMENDER_URL: &str = "https://api.mistral.ai/v1/chat/completions";

/// Environment variables overlaid on top of the config file.
pub const ENV_API_TOKEN: &str = "API_TOKEN";
pub const ENV_RECOMMENDER_KEY: &str = "MISTRAL_AI_API_TOKEN";
pub const ENV_WEATHER_KEY: &str = "WEATHER_RSA_KEY";
pub const ENV_BIND: &str = "BIND_ADDR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_string() }
    }
}

/// Weather provider (Visual Crossing timeline API).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self { api_key: None, base_url: DEFAULT_WEATHER_BASE_URL.to_string() }
    }
}

/// Chat-completions endpoint used for activity recommendations.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_RECOMMENDER_URL.to_string(),
            model: "mistral-tiny".to_string(),
            temperature: 0.5,
            top_p: 1.0,
            max_tokens: 200,
        }
    }
}

/// Outbound HTTP settings shared by both clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// No timeout unless set.
    pub timeout_secs: Option<u64>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Top-level configuration.
///
/// Example TOML:
/// ```toml
/// api_token = "..."
///
/// [weather]
/// api_key = "..."
///
/// [recommender]
/// api_key = "..."
/// model = "mistral-tiny"
/// ```
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /// Shared secret callers must send as `token`.
    pub api_token: Option<String>,
    pub weather: WeatherConfig,
    pub recommender: RecommenderConfig,
    pub http: HttpConfig,
}

/// The three secrets the service cannot run without.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_token: String,
    pub weather_api_key: String,
    pub recommender_api_key: String,
}

/// Debug stand-in for an optional secret: shows whether it is set, never its value.
fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for RecommenderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommenderConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("url", &self.url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("api_token", &redacted(&self.api_token))
            .field("weather", &self.weather)
            .field("recommender", &self.recommender)
            .field("http", &self.http)
            .finish()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"<redacted>")
            .field("weather_api_key", &"<redacted>")
            .field("recommender_api_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load config from the platform config dir, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_API_TOKEN) {
            self.api_token = Some(v);
        }
        if let Some(v) = get(ENV_WEATHER_KEY) {
            self.weather.api_key = Some(v);
        }
        if let Some(v) = get(ENV_RECOMMENDER_KEY) {
            self.recommender.api_key = Some(v);
        }
        if let Some(v) = get(ENV_BIND) {
            self.server.bind = v;
        }
    }

    /// Collect the secrets, failing with a hint for the first one that is missing.
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            api_token: required(self.api_token.as_deref(), ENV_API_TOKEN, "api_token")?,
            weather_api_key: required(
                self.weather.api_key.as_deref(),
                ENV_WEATHER_KEY,
                "[weather] api_key",
            )?,
            recommender_api_key: required(
                self.recommender.api_key.as_deref(),
                ENV_RECOMMENDER_KEY,
                "[recommender] api_key",
            )?,
        })
    }
}

fn required(value: Option<&str>, env: &str, toml_key: &str) -> Result<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned).ok_or_else(|| {
        anyhow!(
            "Missing secret {env}.\n\
             Hint: export {env}=... or set `{toml_key}` in the config file."
        )
    })
}
