use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Literal emitted instead of hourly samples when the provider sent no hours.
pub const NO_HOURLY_INFORMATION: &str = "No hourly information";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherRequest {
    pub location: String,
    pub date: NaiveDate,
}

/// Subset of the provider's timeline document that the service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub days: Vec<DayRecord>,
}

/// One day of the timeline. Temperatures are Fahrenheit.
#[derive(Debug, Clone, Deserialize)]
pub struct DayRecord {
    pub temp: f64,
    #[serde(default)]
    pub windspeed: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    /// `None` when the field is absent or null.
    #[serde(default)]
    pub hours: Option<Vec<HourRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HourRecord {
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySample {
    pub datetime: Option<String>,
    pub icon: Option<String>,
    pub temp_c: f64,
}

/// Element of `weather_for_every_6_hours`: either a sample or the placeholder string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HourlyEntry {
    Sample(HourlySample),
    Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSummary {
    pub temp_c: f64,
    pub wind_kph: Option<f64>,
    pub pressure_mb: Option<f64>,
    pub humidity: Option<f64>,
    pub weather_for_every_6_hours: Vec<HourlyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDocument {
    pub requester_name: String,
    pub timestamp: String,
    pub location: String,
    pub date: String,
    pub weather: WeatherSummary,
    pub recommendations: String,
}
