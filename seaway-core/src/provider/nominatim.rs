//! Forward geocoding via Nominatim (OpenStreetMap). No API key, but the usage
//! policy requires an identifying User-Agent.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    Config,
    model::{Coordinate, Place},
};

use super::{GeocodingSource, ProviderError, fetch_body, http_client};

const PROVIDER: &str = "Nominatim";
const SEARCH_PATH: &str = "/search";

#[derive(Debug, Clone)]
pub struct NominatimProvider {
    base_url: String,
    http: Client,
}

impl NominatimProvider {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http = http_client(timeout, user_agent)
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            &config.nominatim.base_url,
            &config.nominatim.user_agent,
            config.http.timeout(),
        )?)
    }

    async fn search(&self, location: &str) -> Result<Place, ProviderError> {
        let url = format!("{}{SEARCH_PATH}", self.base_url);

        let request = self
            .http
            .get(url)
            .query(&[("q", location), ("format", "json"), ("limit", "1")]);

        let body = fetch_body(PROVIDER, request).await?;

        let results: Vec<NominatimPlace> = serde_json::from_str(&body)
            .map_err(|source| ProviderError::Parse { provider: PROVIDER, source })?;

        // Only the best match matters, even if the server ignores `limit`.
        let first = results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(location.to_string()))?;

        first.into_place(location)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: Option<String>,
    lat: Option<Coordinate>,
    lon: Option<Coordinate>,
}

impl NominatimPlace {
    fn into_place(self, location: &str) -> Result<Place, ProviderError> {
        let missing = |field| ProviderError::MissingField { provider: PROVIDER, field };

        Ok(Place {
            display_name: self
                .display_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| location.to_string()),
            latitude: self.lat.ok_or_else(|| missing("lat"))?,
            longitude: self.lon.ok_or_else(|| missing("lon"))?,
        })
    }
}

#[async_trait]
impl GeocodingSource for NominatimProvider {
    async fn locate(&self, location: &str) -> Result<Place, ProviderError> {
        match self.search(location).await {
            Ok(place) => {
                tracing::info!(
                    location,
                    lat = %place.latitude,
                    lon = %place.longitude,
                    "coordinates data received"
                );
                Ok(place)
            }
            Err(err) => {
                tracing::warn!(location, error = %err, "coordinates lookup failed");
                Err(err)
            }
        }
    }
}
