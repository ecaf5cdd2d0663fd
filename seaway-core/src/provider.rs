use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{fmt::Debug, time::Duration};
use thiserror::Error;

use crate::model::{Place, WeatherReport};

pub mod nominatim;
pub mod openweather;

pub use nominatim::NominatimProvider;
pub use openweather::OpenWeatherProvider;

/// Everything that can go wrong talking to an upstream provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request timed out")]
    Timeout { provider: &'static str },

    #[error("request to {provider} failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("failed to parse {provider} response: {source}")]
    Parse {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} response is missing `{field}`")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    #[error("Location not found: {0}")]
    NotFound(String),
}

impl ProviderError {
    pub(crate) fn from_reqwest(provider: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ProviderError::Timeout { provider }
        } else {
            ProviderError::Request { provider, source }
        }
    }
}

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> Result<WeatherReport, ProviderError>;
}

#[async_trait]
pub trait GeocodingSource: Send + Sync + Debug {
    async fn locate(&self, location: &str) -> Result<Place, ProviderError>;
}

/// Shared reqwest client setup: every outbound call is bounded by `timeout`.
pub(crate) fn http_client(timeout: Duration, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).user_agent(user_agent).build()
}

/// Fetch a URL and hand back the body, turning transport failures and non-2xx
/// statuses into `ProviderError`.
pub(crate) async fn fetch_body(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<String, ProviderError> {
    let res = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
