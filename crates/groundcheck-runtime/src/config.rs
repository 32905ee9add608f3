//! Fetch configuration.
//!
//! Built once at process start and handed to the HTTP source. Every key may
//! come from an optional YAML/JSON config file and falls back to the
//! provider's environment variable.
//!
//! ```yaml
//! timeout: 20s
//! google_geocoding_api_key: "..."
//! openweather_api_key: "..."
//! exchange_rate_api_key: "..."
//! open_notify_base_url: "http://localhost:8080"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::providers::ApiCredential;

pub const GOOGLE_GEOCODING_API_KEY_ENV: &str = "GOOGLE_GEOCODING_API_KEY";
pub const OPENWEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const EXCHANGE_RATE_API_KEY_ENV: &str = "EXCHANGE_RATE_API_KEY";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_OPEN_NOTIFY_BASE_URL: &str = "http://api.open-notify.org";
pub const DEFAULT_EXCHANGE_RATE_BASE_URL: &str = "https://v6.exchangerate-api.com";

/// Errors loading the fetch configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timeout '{value}': {message}")]
    InvalidTimeout { value: String, message: String },

    #[error("{key} must start with http:// or https://, got '{value}'")]
    InvalidBaseUrl { key: &'static str, value: String },
}

/// Keys, endpoints and timeout for canonical fetches.
#[derive(Debug)]
pub struct FetchConfig {
    pub timeout: Duration,

    pub google_geocoding_api_key: Option<ApiCredential>,
    pub openweather_api_key: Option<ApiCredential>,
    pub exchange_rate_api_key: Option<ApiCredential>,

    pub geocoding_base_url: String,
    pub openweather_base_url: String,
    pub open_notify_base_url: String,
    pub exchange_rate_base_url: String,
}

impl FetchConfig {
    /// Configuration from environment variables and defaults only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_json(&JsonValue::Object(Default::default()))
    }

    /// Load a YAML (`.yaml`/`.yml`) or JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let value: JsonValue = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };
        Self::from_json(&value)
    }

    /// Build from a parsed config object, falling back to the environment.
    pub fn from_json(config: &JsonValue) -> Result<Self, ConfigError> {
        let timeout = match &config["timeout"] {
            JsonValue::String(s) => {
                humantime::parse_duration(s).map_err(|e| ConfigError::InvalidTimeout {
                    value: s.clone(),
                    message: e.to_string(),
                })?
            }
            // Bare numbers are seconds.
            JsonValue::Number(n) => match n.as_f64() {
                Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        value: n.to_string(),
                        message: "must be a positive number of seconds".to_string(),
                    })
                }
            },
            _ => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            timeout,
            google_geocoding_api_key: ApiCredential::lookup(
                config,
                "google_geocoding_api_key",
                GOOGLE_GEOCODING_API_KEY_ENV,
                "Google Geocoding API key",
            ),
            openweather_api_key: ApiCredential::lookup(
                config,
                "openweather_api_key",
                OPENWEATHER_API_KEY_ENV,
                "OpenWeather API key",
            ),
            exchange_rate_api_key: ApiCredential::lookup(
                config,
                "exchange_rate_api_key",
                EXCHANGE_RATE_API_KEY_ENV,
                "ExchangeRate-API key",
            ),
            geocoding_base_url: base_url(config, "geocoding_base_url", DEFAULT_GEOCODING_BASE_URL)?,
            openweather_base_url: base_url(
                config,
                "openweather_base_url",
                DEFAULT_OPENWEATHER_BASE_URL,
            )?,
            open_notify_base_url: base_url(
                config,
                "open_notify_base_url",
                DEFAULT_OPEN_NOTIFY_BASE_URL,
            )?,
            exchange_rate_base_url: base_url(
                config,
                "exchange_rate_base_url",
                DEFAULT_EXCHANGE_RATE_BASE_URL,
            )?,
        })
    }

    /// Replace the timeout, e.g. from a command-line override.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn base_url(config: &JsonValue, key: &'static str, default: &str) -> Result<String, ConfigError> {
    let Some(url) = config[key].as_str() else {
        return Ok(default.to_string());
    };
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidBaseUrl {
            key,
            value: url.to_string(),
        });
    }
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::from_json(&json!({})).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.open_notify_base_url, DEFAULT_OPEN_NOTIFY_BASE_URL);
        assert_eq!(config.exchange_rate_base_url, DEFAULT_EXCHANGE_RATE_BASE_URL);
    }

    #[test]
    fn test_humantime_and_numeric_timeout() {
        let config = FetchConfig::from_json(&json!({"timeout": "1m 30s"})).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(90));

        let config = FetchConfig::from_json(&json!({"timeout": 5})).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        let config = config.with_timeout(Duration::from_millis(1500));
        assert_eq!(config.timeout, Duration::from_millis(1500));

        assert!(matches!(
            FetchConfig::from_json(&json!({"timeout": "soon"})),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(FetchConfig::from_json(&json!({"timeout": -1})).is_err());
    }

    #[test]
    fn test_base_url_override() {
        let overridden = json!({"open_notify_base_url": "http://localhost:9000/"});
        let config = FetchConfig::from_json(&overridden).unwrap();
        assert_eq!(config.open_notify_base_url, "http://localhost:9000");

        assert!(matches!(
            FetchConfig::from_json(&json!({"openweather_base_url": "ftp://example.com"})),
            Err(ConfigError::InvalidBaseUrl { key: "openweather_base_url", .. })
        ));
    }

    #[test]
    fn test_key_from_config_is_redacted() {
        let config = FetchConfig::from_json(&json!({"openweather_api_key": "owm-secret"})).unwrap();
        let key = config.openweather_api_key.as_ref().unwrap();
        assert_eq!(key.expose(), "owm-secret");
        assert!(!format!("{:?}", config).contains("owm-secret"));
    }

    #[test]
    fn test_yaml_file() {
        let dir = std::env::temp_dir().join(format!("groundcheck-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fetch.yaml");
        fs::write(&path, "timeout: 3s\nexchange_rate_api_key: fx-key\n").unwrap();

        let config = FetchConfig::from_file(&path).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.exchange_rate_api_key.as_ref().unwrap().expose(), "fx-key");

        fs::remove_dir_all(&dir).ok();
    }
}
