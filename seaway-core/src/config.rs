use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable holding the OpenWeather API key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";
/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "PORT";

const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 10;

/// How `/weather-map` reacts when one of the two lookups fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    /// Any failed lookup turns the whole response into a 500.
    #[default]
    FailFast,
    /// Always 200, both records embedded as-is.
    BestEffort,
}

impl AggregationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPolicy::FailFast => "fail-fast",
            AggregationPolicy::BestEffort => "best-effort",
        }
    }

    pub const fn all() -> &'static [AggregationPolicy] {
        &[AggregationPolicy::FailFast, AggregationPolicy::BestEffort]
    }
}

impl std::fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AggregationPolicy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "fail-fast" | "failfast" => Ok(AggregationPolicy::FailFast),
            "best-effort" | "besteffort" => Ok(AggregationPolicy::BestEffort),
            _ => Err(anyhow!(
                "Unknown aggregation policy '{value}'. Supported policies: fail-fast, best-effort."
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout for outbound calls, clamped into 5..=10 seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: MAX_TIMEOUT_SECS }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of distinct keys per provider cache.
    pub capacity: usize,
    /// How long a failed lookup stays cached. Zero disables error caching.
    pub error_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            error_ttl_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn error_ttl(&self) -> Duration {
        Duration::from_secs(self.error_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "SeawayApp/1.0".to_string(),
        }
    }
}

/// Top-level service configuration.
///
/// Example TOML:
/// ```toml
/// aggregation = "best-effort"
///
/// [openweather]
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aggregation: AggregationPolicy,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub openweather: OpenWeatherConfig,
    pub nominatim: NominatimConfig,
}

impl Config {
    /// Load config from `path`, or from the platform config file when no path
    /// is given. Environment overrides are applied on top.
    ///
    /// An explicit path must exist; the platform file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::config_file_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        cfg.apply_env(|name| std::env::var(name).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Path to the platform config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "seaway", "seaway")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `WEATHER_API_KEY` and `PORT` using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.openweather.api_key = Some(key);
        }

        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {PORT_ENV} value '{port}'"))?;
        }

        Ok(())
    }

    /// Returns the weather API key, if one is configured and non-blank.
    pub fn weather_api_key(&self) -> Option<&str> {
        self.openweather
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// Startup checks; the service refuses to run rather than query with an
    /// empty key.
    pub fn validate(&self) -> Result<()> {
        if self.weather_api_key().is_none() {
            bail!(
                "No OpenWeather API key configured.\n\
                 Hint: export {API_KEY_ENV}=<key> or set `api_key` under [openweather] in the config file."
            );
        }

        if self.cache.capacity == 0 {
            bail!("Cache capacity must be at least 1");
        }

        Ok(())
    }
}
