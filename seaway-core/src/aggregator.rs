use serde::Serialize;

use crate::{
    AggregationPolicy, Config,
    client::{GeocodingClient, WeatherClient},
    model::{CoordinateRecord, Record, WeatherRecord},
};

/// Used by `/weather` and `/map` when no query is given.
pub const DEFAULT_LOCATION: &str = "Lagos";

pub const MISSING_LOCATION: &str = "Missing location parameter";

/// Which lookup produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Coordinates,
    Weather,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Coordinates => "Coordinates",
            Stage::Weather => "Weather",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handling one request, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Combined {
        coordinates: CoordinateRecord,
        weather: WeatherRecord,
    },
    Weather(WeatherRecord),
    Coordinates(CoordinateRecord),
    /// A lookup failed under the fail-fast policy.
    Failed { error: String },
    /// The request itself was unusable.
    Invalid { error: String },
}

impl Outcome {
    fn failed(stage: Stage, message: &str) -> Self {
        Outcome::Failed {
            error: format!("{stage} fetch failed: {message}"),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Invalid { .. } => 400,
            Outcome::Failed { .. } => 500,
            _ => 200,
        }
    }
}

#[derive(Debug)]
pub struct Aggregator {
    weather: WeatherClient,
    geocoder: GeocodingClient,
    policy: AggregationPolicy,
}

impl Aggregator {
    pub fn new(weather: WeatherClient, geocoder: GeocodingClient, policy: AggregationPolicy) -> Self {
        Self { weather, geocoder, policy }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            WeatherClient::from_config(config)?,
            GeocodingClient::from_config(config)?,
            config.aggregation,
        ))
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Geocode and fetch weather for the same location, concurrently.
    pub async fn weather_map(&self, location: Option<&str>) -> Outcome {
        let Some(location) = non_blank(location) else {
            return Outcome::Invalid {
                error: MISSING_LOCATION.to_string(),
            };
        };

        tracing::info!(location, "handling weather-map request");

        let (coordinates, weather) = tokio::join!(
            self.geocoder.fetch_coordinates(location),
            self.weather.fetch_weather(location),
        );

        if self.policy == AggregationPolicy::FailFast {
            if let Some(message) = coordinates.error() {
                return Outcome::failed(Stage::Coordinates, message);
            }
            if let Some(message) = weather.error() {
                return Outcome::failed(Stage::Weather, message);
            }
        }

        tracing::info!(location, "combined coordinates and weather");
        Outcome::Combined { coordinates, weather }
    }

    pub async fn weather(&self, city: Option<&str>) -> Outcome {
        let city = non_blank(city).unwrap_or(DEFAULT_LOCATION);
        let record = self.weather.fetch_weather(city).await;

        if self.policy == AggregationPolicy::FailFast {
            if let Some(message) = record.error() {
                return Outcome::failed(Stage::Weather, message);
            }
        }
        Outcome::Weather(record)
    }

    pub async fn coordinates(&self, location: Option<&str>) -> Outcome {
        let location = non_blank(location).unwrap_or(DEFAULT_LOCATION);
        let record = self.geocoder.fetch_coordinates(location).await;

        if self.policy == AggregationPolicy::FailFast {
            if let Some(message) = record.error() {
                return Outcome::failed(Stage::Coordinates, message);
            }
        }
        Outcome::Coordinates(record)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
