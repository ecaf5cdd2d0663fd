use std::{sync::Arc, time::Duration};

use crate::{
    Config,
    cache::BoundedCache,
    model::{CoordinateRecord, WeatherRecord},
    provider::{GeocodingSource, NominatimProvider, OpenWeatherProvider, WeatherSource},
};

/// Weather lookups through a memoizing cache. Never fails: provider errors
/// come back as [`WeatherRecord::Error`].
#[derive(Debug)]
pub struct WeatherClient {
    source: Arc<dyn WeatherSource>,
    cache: BoundedCache<WeatherRecord>,
}

impl WeatherClient {
    pub fn new(source: Arc<dyn WeatherSource>, capacity: usize, error_ttl: Duration) -> Self {
        Self {
            source,
            cache: BoundedCache::new(capacity, error_ttl),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source = Arc::new(OpenWeatherProvider::from_config(config)?);
        Ok(Self::new(source, config.cache.capacity, config.cache.error_ttl()))
    }

    pub async fn fetch_weather(&self, city: &str) -> WeatherRecord {
        self.cache
            .get_or_fetch(city, || async {
                WeatherRecord::from(self.source.current_weather(city).await)
            })
            .await
    }

    pub fn cache(&self) -> &BoundedCache<WeatherRecord> {
        &self.cache
    }
}

/// Geocoding lookups through a memoizing cache. Never fails: provider errors
/// come back as [`CoordinateRecord::Error`].
#[derive(Debug)]
pub struct GeocodingClient {
    source: Arc<dyn GeocodingSource>,
    cache: BoundedCache<CoordinateRecord>,
}

impl GeocodingClient {
    pub fn new(source: Arc<dyn GeocodingSource>, capacity: usize, error_ttl: Duration) -> Self {
        Self {
            source,
            cache: BoundedCache::new(capacity, error_ttl),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source = Arc::new(NominatimProvider::from_config(config)?);
        Ok(Self::new(source, config.cache.capacity, config.cache.error_ttl()))
    }

    pub async fn fetch_coordinates(&self, location: &str) -> CoordinateRecord {
        self.cache
            .get_or_fetch(location, || async {
                CoordinateRecord::from(self.source.locate(location).await)
            })
            .await
    }

    pub fn cache(&self) -> &BoundedCache<CoordinateRecord> {
        &self.cache
    }
}
