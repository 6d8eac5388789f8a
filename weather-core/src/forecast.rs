//! Unit conversion and hourly sampling of a provider snapshot.

use crate::{
    error::ApiError,
    model::{
        HourRecord, HourlyEntry, HourlySample, NO_HOURLY_INFORMATION, WeatherSnapshot,
        WeatherSummary,
    },
};

/// Hourly records are kept at indices 0, 6, 12, ...
pub const SAMPLE_STRIDE: usize = 6;

/// Fahrenheit to Celsius, rounded to one decimal place.
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    let celsius = (fahrenheit - 32.0) * 5.0 / 9.0;
    (celsius * 10.0).round() / 10.0
}

pub fn sample_every_six_hours(hours: Option<&[HourRecord]>) -> Vec<HourlyEntry> {
    let Some(hours) = hours else {
        return vec![HourlyEntry::Placeholder(NO_HOURLY_INFORMATION)];
    };

    hours
        .iter()
        .step_by(SAMPLE_STRIDE)
        .map(|hour| {
            HourlyEntry::Sample(HourlySample {
                datetime: hour.datetime.clone(),
                icon: hour.icon.clone(),
                temp_c: fahrenheit_to_celsius(hour.temp),
            })
        })
        .collect()
}

/// Build the weather section of the response from the first day of the snapshot.
pub fn summarize(snapshot: &WeatherSnapshot) -> Result<WeatherSummary, ApiError> {
    let day = snapshot
        .days
        .first()
        .ok_or_else(|| ApiError::bad_gateway("weather provider returned no daily data"))?;

    // Wind, pressure and humidity already arrive in the units we report.
    Ok(WeatherSummary {
        temp_c: fahrenheit_to_celsius(day.temp),
        wind_kph: day.windspeed,
        pressure_mb: day.pressure,
        humidity: day.humidity,
        weather_for_every_6_hours: sample_every_six_hours(day.hours.as_deref()),
    })
}
