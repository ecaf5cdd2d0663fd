use serde::{Deserialize, Serialize};
use std::fmt;

use crate::provider::ProviderError;

/// Current conditions for a city, flattened from the provider payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: u8,
    pub description: String,
}

/// Outcome of a weather lookup. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeatherRecord {
    Report(WeatherReport),
    Error { error: String },
}

/// Latitude or longitude as the provider sent it.
///
/// Nominatim encodes coordinates as decimal strings; those are passed through
/// untouched so no precision is lost in transit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Text(String),
    Number(f64),
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Text(s) => f.write_str(s),
            Coordinate::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub display_name: String,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
}

/// Outcome of a geocoding lookup. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateRecord {
    Place(Place),
    Error { error: String },
}

/// Shared shape of the two record types, used by the cache and aggregator.
pub trait Record: Clone + Send + Sync + 'static {
    /// The error message if this record is a failure.
    fn error(&self) -> Option<&str>;

    fn is_error(&self) -> bool {
        self.error().is_some()
    }
}

impl Record for WeatherRecord {
    fn error(&self) -> Option<&str> {
        match self {
            WeatherRecord::Report(_) => None,
            WeatherRecord::Error { error } => Some(error),
        }
    }
}

impl Record for CoordinateRecord {
    fn error(&self) -> Option<&str> {
        match self {
            CoordinateRecord::Place(_) => None,
            CoordinateRecord::Error { error } => Some(error),
        }
    }
}

impl From<Result<WeatherReport, ProviderError>> for WeatherRecord {
    fn from(result: Result<WeatherReport, ProviderError>) -> Self {
        match result {
            Ok(report) => WeatherRecord::Report(report),
            Err(err) => WeatherRecord::Error { error: err.to_string() },
        }
    }
}

impl From<Result<Place, ProviderError>> for CoordinateRecord {
    fn from(result: Result<Place, ProviderError>) -> Self {
        match result {
            Ok(place) => CoordinateRecord::Place(place),
            Err(err) => CoordinateRecord::Error { error: err.to_string() },
        }
    }
}
