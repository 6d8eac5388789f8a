//! Request validation and sequencing of the weather and recommendation calls.

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::ApiError,
    forecast,
    model::{ResponseDocument, WeatherRequest},
    provider::WeatherProvider,
    recommender::Recommender,
};

/// Fields every generate request must carry, checked in this order.
pub const REQUIRED_FIELDS: [&str; 4] = ["token", "requester_name", "location", "date"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Validated inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GenerateRequest {
    token: String,
    requester_name: String,
    location: String,
    date: String,
}

#[derive(Clone)]
pub struct Handler {
    api_token: String,
    weather: Arc<dyn WeatherProvider>,
    recommender: Arc<dyn Recommender>,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("weather", &self.weather)
            .field("recommender", &self.recommender)
            .finish_non_exhaustive()
    }
}

impl Handler {
    pub fn new(
        api_token: String,
        weather: Arc<dyn WeatherProvider>,
        recommender: Arc<dyn Recommender>,
    ) -> Self {
        Self { api_token, weather, recommender }
    }

    /// Handle one generate request given its raw JSON body.
    pub async fn generate(&self, body: &[u8]) -> Result<ResponseDocument, ApiError> {
        let request = parse_request(body)?;

        if request.token != self.api_token {
            return Err(ApiError::forbidden("wrong API token"));
        }

        let date = parse_date(&request.date)?;

        info!(
            requester = %request.requester_name,
            location = %request.location,
            %date,
            "generating weather report"
        );

        let snapshot = self
            .weather
            .get_weather(&WeatherRequest { location: request.location.clone(), date })
            .await?;

        let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let weather = forecast::summarize(&snapshot)?;

        debug!(temp_c = weather.temp_c, "weather summarized");

        let recommendations = self.recommender.recommend(&weather).await;

        Ok(ResponseDocument {
            requester_name: request.requester_name,
            timestamp,
            location: request.location,
            date: request.date,
            weather,
            recommendations,
        })
    }
}

fn parse_request(body: &[u8]) -> Result<GenerateRequest, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::validation("request body must be valid JSON"))?;

    let Value::Object(fields) = value else {
        return Err(ApiError::validation("request body must be a JSON object"));
    };

    // All presence checks run before any type check.
    if let Some(missing) =
        REQUIRED_FIELDS.iter().find(|name| fields.get(**name).is_none_or(Value::is_null))
    {
        return Err(ApiError::missing_field(missing));
    }

    Ok(GenerateRequest {
        token: string_field(&fields, "token")?,
        requester_name: string_field(&fields, "requester_name")?,
        location: string_field(&fields, "location")?,
        date: string_field(&fields, "date")?,
    })
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, ApiError> {
    match fields.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(ApiError::validation(format!("{name} must be a string")).with_payload("field", name)),
    }
}

/// Calendar date in ISO-8601 extended form, e.g. `2024-03-05`.
///
/// Exactly `YYYY-MM-DD` with zero-padded fields and a year of at least 1, so the
/// date sent upstream is byte-for-byte the one echoed back.
fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    let invalid = || ApiError::validation("invalid date");

    let bytes = raw.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(invalid());
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    if date.year() < 1 {
        return Err(invalid());
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RecommenderConfig,
        error::ErrorKind,
        model::{HourlyEntry, WeatherSnapshot, WeatherSummary},
        provider::ProviderError,
        recommender::mistral::MistralRecommender,
        test_support,
    };
    use async_trait::async_trait;
    use axum::{Router, http::StatusCode, routing::post};
    use chrono::NaiveDateTime;
    use serde_json::json;
    use std::sync::Mutex;

    const TOKEN: &str = "secret";

    /// Replays a canned provider outcome and records what it was asked for.
    #[derive(Debug)]
    struct FakeWeather {
        outcome: Result<Value, (u16, String)>,
        calls: Mutex<Vec<WeatherRequest>>,
    }

    impl FakeWeather {
        fn ok(body: Value) -> Arc<Self> {
            Arc::new(Self { outcome: Ok(body), calls: Mutex::default() })
        }

        fn failing(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self { outcome: Err((status, body.to_string())), calls: Mutex::default() })
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn get_weather(
            &self,
            request: &WeatherRequest,
        ) -> Result<WeatherSnapshot, ProviderError> {
            self.calls.lock().unwrap().push(request.clone());
            match &self.outcome {
                Ok(body) => Ok(serde_json::from_value(body.clone())?),
                Err((status, body)) => {
                    Err(ProviderError::Upstream { status: *status, body: body.clone() })
                }
            }
        }
    }

    #[derive(Debug)]
    struct FakeRecommender {
        reply: String,
        seen: Mutex<Vec<WeatherSummary>>,
    }

    impl FakeRecommender {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self { reply: reply.to_string(), seen: Mutex::default() })
        }
    }

    #[async_trait]
    impl Recommender for FakeRecommender {
        async fn recommend(&self, weather: &WeatherSummary) -> String {
            self.seen.lock().unwrap().push(weather.clone());
            self.reply.clone()
        }
    }

    fn day_without_hours() -> Value {
        json!({ "days": [{ "temp": 50.0, "windspeed": 10.0, "humidity": 60.0, "pressure": 1013.0 }] })
    }

    fn full_day() -> Value {
        let hours: Vec<Value> = (0..24)
            .map(|h| json!({ "datetime": format!("{h:02}:00:00"), "icon": "cloudy", "temp": 32.0 }))
            .collect();
        json!({ "days": [{ "temp": 212.0, "windspeed": 3.5, "humidity": 80.0, "pressure": 990.0, "hours": hours }] })
    }

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn valid_body() -> Value {
        json!({ "token": TOKEN, "requester_name": "Ann", "location": "Kyiv", "date": "2024-03-05" })
    }

    fn handler(weather: Arc<FakeWeather>, recommender: Arc<FakeRecommender>) -> Handler {
        Handler::new(TOKEN.to_string(), weather, recommender)
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_by_name() {
        let weather = FakeWeather::ok(day_without_hours());
        let h = handler(weather.clone(), FakeRecommender::replying("go"));

        for field in REQUIRED_FIELDS {
            let mut req = valid_body();
            req.as_object_mut().unwrap().remove(field);

            let err = h.generate(&body(req)).await.unwrap_err();
            assert_eq!(err.status_code, 400);
            assert_eq!(err.message, format!("{field} is required"));
        }

        assert!(weather.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn null_field_counts_as_missing() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));

        let mut req = valid_body();
        req["requester_name"] = Value::Null;

        let err = h.generate(&body(req)).await.unwrap_err();
        assert_eq!(err.body(), json!({ "message": "requester_name is required", "field": "requester_name" }));
    }

    #[tokio::test]
    async fn missing_field_wins_over_wrong_token() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));

        let err = h
            .generate(&body(json!({ "token": "nope", "requester_name": "Ann", "location": "Kyiv" })))
            .await
            .unwrap_err();
        assert_eq!(err.status_code, 400);
        assert_eq!(err.message, "date is required");
    }

    #[tokio::test]
    async fn wrong_token_is_forbidden() {
        let weather = FakeWeather::ok(day_without_hours());
        let h = handler(weather.clone(), FakeRecommender::replying("go"));

        let mut req = valid_body();
        req["token"] = json!("guess");

        let err = h.generate(&body(req)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(err.status_code, 403);
        assert!(weather.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_comparison_is_exact() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));

        let mut req = valid_body();
        req["token"] = json!(format!("{TOKEN} "));

        assert_eq!(h.generate(&body(req)).await.unwrap_err().status_code, 403);
    }

    #[tokio::test]
    async fn malformed_dates_are_rejected() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));

        for date in [
            "2024-13-40",
            "not-a-date",
            "2023-02-29",
            "2024-03-05T10:00:00",
            "",
            "2024-3-5",
            "+2024-03-05",
            " 2024-03-05",
            "2024-03-05 ",
            "0000-01-01",
            "2024/03/05",
        ] {
            let mut req = valid_body();
            req["date"] = json!(date);

            let err = h.generate(&body(req)).await.unwrap_err();
            assert_eq!(err.status_code, 400, "date {date:?}");
            assert_eq!(err.message, "invalid date");
        }
    }

    #[test]
    fn debug_hides_api_token() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));
        let shown = format!("{h:?}");

        assert!(!shown.contains(TOKEN));
        assert!(shown.contains("FakeWeather"));
    }

    #[test]
    fn strict_dates_parse_unchanged() {
        assert_eq!(parse_date("2024-03-05"), Ok(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));
        assert_eq!(parse_date("0001-01-01"), Ok(NaiveDate::from_ymd_opt(1, 1, 1).unwrap()));
        assert_eq!(parse_date("2024-02-29").unwrap().to_string(), "2024-02-29");
    }

    #[tokio::test]
    async fn non_json_and_non_object_bodies_are_rejected() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));

        assert_eq!(h.generate(b"{not json").await.unwrap_err().status_code, 400);
        assert_eq!(h.generate(b"[1, 2]").await.unwrap_err().status_code, 400);
    }

    #[tokio::test]
    async fn non_string_field_is_rejected() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));

        let mut req = valid_body();
        req["location"] = json!(42);

        let err = h.generate(&body(req)).await.unwrap_err();
        assert_eq!(err.status_code, 400);
        assert_eq!(err.message, "location must be a string");
    }

    #[tokio::test]
    async fn day_without_hours_yields_placeholder() {
        let weather = FakeWeather::ok(day_without_hours());
        let recommender = FakeRecommender::replying("Go for a walk.");
        let h = handler(weather.clone(), recommender.clone());

        let doc = h.generate(&body(valid_body())).await.unwrap();
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["requester_name"], "Ann");
        assert_eq!(json["location"], "Kyiv");
        assert_eq!(json["date"], "2024-03-05");
        assert_eq!(json["weather"]["temp_c"], 10.0);
        assert_eq!(json["weather"]["wind_kph"], 10.0);
        assert_eq!(json["weather"]["humidity"], 60.0);
        assert_eq!(json["weather"]["pressure_mb"], 1013.0);
        assert_eq!(json["weather"]["weather_for_every_6_hours"], json!(["No hourly information"]));
        assert_eq!(json["recommendations"], "Go for a walk.");

        let calls = weather.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].location, "Kyiv");
        assert_eq!(calls[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        assert_eq!(recommender.seen.lock().unwrap()[0], doc.weather);
    }

    #[tokio::test]
    async fn full_day_is_sampled_every_six_hours() {
        let h = handler(FakeWeather::ok(full_day()), FakeRecommender::replying("Stay in."));

        let doc = h.generate(&body(valid_body())).await.unwrap();

        assert_eq!(doc.weather.temp_c, 100.0);
        let times: Vec<_> = doc
            .weather
            .weather_for_every_6_hours
            .iter()
            .map(|entry| match entry {
                HourlyEntry::Sample(s) => (s.datetime.clone().unwrap(), s.temp_c),
                HourlyEntry::Placeholder(p) => panic!("unexpected placeholder {p}"),
            })
            .collect();
        assert_eq!(
            times,
            [
                ("00:00:00".to_string(), 0.0),
                ("06:00:00".to_string(), 0.0),
                ("12:00:00".to_string(), 0.0),
                ("18:00:00".to_string(), 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn timestamp_is_utc_seconds() {
        let h = handler(FakeWeather::ok(day_without_hours()), FakeRecommender::replying("go"));

        let doc = h.generate(&body(valid_body())).await.unwrap();

        assert!(doc.timestamp.ends_with('Z'));
        assert!(NaiveDateTime::parse_from_str(&doc.timestamp, TIMESTAMP_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn weather_failure_propagates_status_and_body() {
        let recommender = FakeRecommender::replying("go");
        let h = handler(FakeWeather::failing(404, "not found"), recommender.clone());

        let err = h.generate(&body(valid_body())).await.unwrap_err();

        assert_eq!(err.status_code, 404);
        assert_eq!(err.body(), json!({ "message": "not found" }));
        assert!(recommender.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_days_is_bad_gateway() {
        let h = handler(FakeWeather::ok(json!({ "days": [] })), FakeRecommender::replying("go"));

        let err = h.generate(&body(valid_body())).await.unwrap_err();
        assert_eq!(err.status_code, 502);
    }

    #[tokio::test]
    async fn failing_model_still_returns_full_weather() {
        let model = test_support::serve(Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded") }),
        ))
        .await;
        let settings = RecommenderConfig {
            url: format!("{model}/v1/chat/completions"),
            ..RecommenderConfig::default()
        };
        let recommender = MistralRecommender::new(settings, "mk".into(), None).unwrap();
        let h = Handler::new(
            TOKEN.to_string(),
            FakeWeather::ok(full_day()),
            Arc::new(recommender),
        );

        let doc = h.generate(&body(valid_body())).await.unwrap();

        assert_eq!(doc.recommendations, "Error: 500, model overloaded");
        assert_eq!(doc.weather.temp_c, 100.0);
        assert_eq!(doc.weather.wind_kph, Some(3.5));
        assert_eq!(doc.weather.pressure_mb, Some(990.0));
        assert_eq!(doc.weather.humidity, Some(80.0));
        assert_eq!(doc.weather.weather_for_every_6_hours.len(), 4);
    }

    #[tokio::test]
    async fn degraded_recommendation_keeps_success() {
        let h = handler(
            FakeWeather::ok(day_without_hours()),
            FakeRecommender::replying("Error: 500, upstream exploded"),
        );

        let doc = h.generate(&body(valid_body())).await.unwrap();

        assert_eq!(doc.recommendations, "Error: 500, upstream exploded");
        assert_eq!(doc.weather.temp_c, 10.0);
        assert_eq!(doc.weather.wind_kph, Some(10.0));
    }
}
