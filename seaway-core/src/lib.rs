//! Core library for the Seaway weather-map API.
//!
//! This crate defines:
//! - Configuration loading (TOML file plus environment overrides)
//! - Weather (OpenWeather) and geocoding (Nominatim) provider clients
//! - A bounded memoization cache wrapping each client
//! - The aggregator that combines both lookups into one response
//!
//! It is used by `seaway-server`, but has no dependency on any HTTP server.

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod config;
pub mod model;
pub mod provider;

pub use aggregator::{Aggregator, Outcome, Stage};
pub use cache::BoundedCache;
pub use client::{GeocodingClient, WeatherClient};
pub use config::{AggregationPolicy, Config};
pub use model::{Coordinate, CoordinateRecord, Place, Record, WeatherRecord, WeatherReport};
pub use provider::{GeocodingSource, ProviderError, WeatherSource};
