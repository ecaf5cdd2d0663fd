use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{Config, model::WeatherReport};

use super::{ProviderError, WeatherSource, fetch_body, http_client};

const PROVIDER: &str = "OpenWeather";
const CURRENT_PATH: &str = "/data/2.5/weather";
const USER_AGENT: &str = concat!("seaway/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http = http_client(timeout, USER_AGENT)
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.weather_api_key().ok_or_else(|| {
            anyhow::anyhow!("No OpenWeather API key configured")
        })?;

        Ok(Self::new(
            api_key.to_owned(),
            &config.openweather.base_url,
            config.http.timeout(),
        )?)
    }

    async fn fetch_current(&self, city: &str) -> Result<WeatherReport, ProviderError> {
        let url = format!("{}{CURRENT_PATH}", self.base_url);

        let request = self.http.get(url).query(&[
            ("q", city),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ]);

        let body = fetch_body(PROVIDER, request).await?;

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|source| ProviderError::Parse { provider: PROVIDER, source })?;

        parsed.into_report(city)
    }
}

// Every field is optional so a sparse payload degrades instead of failing to
// parse.
#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

impl OwCurrentResponse {
    fn into_report(self, city: &str) -> Result<WeatherReport, ProviderError> {
        let missing = |field| ProviderError::MissingField { provider: PROVIDER, field };

        let main = self.main.ok_or_else(|| missing("main"))?;
        let temperature = main.temp.ok_or_else(|| missing("main.temp"))?;
        let humidity = main.humidity.ok_or_else(|| missing("main.humidity"))?;

        let description = self
            .weather
            .into_iter()
            .next()
            .and_then(|w| w.description)
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(WeatherReport {
            city: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| city.to_string()),
            temperature,
            humidity,
            description,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherProvider {
    async fn current_weather(&self, city: &str) -> Result<WeatherReport, ProviderError> {
        match self.fetch_current(city).await {
            Ok(report) => {
                tracing::info!(city, temperature = report.temperature, "weather data received");
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(city, error = %err, "weather lookup failed");
                Err(err)
            }
        }
    }
}
