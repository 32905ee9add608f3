//! HTTP canonical source.
//!
//! One GET per call with the configured timeout. Response envelopes are
//! checked by the `parse_*` functions, which are pure so they can be tested
//! against recorded payloads.

use async_trait::async_trait;
use groundcheck_core::IssSample;
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{
    ApiCredential, CanonicalSource, FetchError, GeoFix, IssFix, RateQuote, WeatherReading,
    EXCHANGE_RATE_PROVIDER, GEOCODING_PROVIDER, ISS_PROVIDER, WEATHER_PROVIDER,
};
use crate::config::{
    FetchConfig, EXCHANGE_RATE_API_KEY_ENV, GOOGLE_GEOCODING_API_KEY_ENV, OPENWEATHER_API_KEY_ENV,
};

/// Upstream error bodies are cut to this many characters in error messages.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Canonical source backed by the public provider APIs.
#[derive(Debug)]
pub struct HttpCanonicalSource {
    config: FetchConfig,
    client: reqwest::Client,
}

impl HttpCanonicalSource {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("groundcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::HttpError(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn require<'a>(
        key: &'a Option<ApiCredential>,
        env_var: &str,
        what: &str,
    ) -> Result<&'a ApiCredential, FetchError> {
        key.as_ref().ok_or_else(|| {
            FetchError::NotConfigured(format!(
                "{} is required for canonical {}: set it in the config file or environment",
                env_var, what
            ))
        })
    }

    async fn get_json(&self, url: String, query: &[(&str, &str)]) -> Result<JsonValue, FetchError> {
        let timeout: Duration = self.config.timeout;
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout)
                } else {
                    // Without the URL: it may carry a key.
                    FetchError::HttpError(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response
            .json::<JsonValue>()
            .await
            .map_err(|e| FetchError::ParseError(e.without_url().to_string()))
    }
}

#[async_trait]
impl CanonicalSource for HttpCanonicalSource {
    async fn geocode(&self, query: &str) -> Result<GeoFix, FetchError> {
        let key = Self::require(
            &self.config.google_geocoding_api_key,
            GOOGLE_GEOCODING_API_KEY_ENV,
            "geocoding",
        )?;
        tracing::debug!(provider = GEOCODING_PROVIDER, query, "Fetching geocode");

        let url = format!("{}/geocode/json", self.config.geocoding_base_url);
        let body = self.get_json(url, &[("address", query), ("key", key.expose())]).await?;
        parse_geocode_response(&body)
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherReading, FetchError> {
        let key =
            Self::require(&self.config.openweather_api_key, OPENWEATHER_API_KEY_ENV, "weather")?;
        tracing::debug!(provider = WEATHER_PROVIDER, lat, lon, "Fetching current weather");

        let url = format!("{}/data/2.5/weather", self.config.openweather_base_url);
        let (lat, lon) = (lat.to_string(), lon.to_string());
        let query = [
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("appid", key.expose()),
            ("units", "metric"),
        ];
        let body = self.get_json(url, &query).await?;
        parse_weather_response(&body)
    }

    async fn iss_position(&self) -> Result<IssFix, FetchError> {
        tracing::debug!(provider = ISS_PROVIDER, "Fetching satellite position");

        let url = format!("{}/iss-now.json", self.config.open_notify_base_url);
        let body = self.get_json(url, &[]).await?;
        parse_iss_response(&body)
    }

    async fn exchange_rate(&self, base: &str, quote: &str) -> Result<RateQuote, FetchError> {
        let key = Self::require(
            &self.config.exchange_rate_api_key,
            EXCHANGE_RATE_API_KEY_ENV,
            "exchange rates",
        )?;
        tracing::debug!(provider = EXCHANGE_RATE_PROVIDER, base, quote, "Fetching exchange rate");

        // This API takes the key as a path segment.
        let url = format!(
            "{}/v6/{}/pair/{}/{}",
            self.config.exchange_rate_base_url,
            key.expose(),
            base,
            quote
        );
        let body = self.get_json(url, &[]).await?;
        parse_exchange_rate_response(&body, base, quote)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Numbers some providers send as strings.
fn lenient_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Google Geocoding: `status == "OK"`, first result's location.
pub fn parse_geocode_response(body: &JsonValue) -> Result<GeoFix, FetchError> {
    let status = body["status"].as_str().unwrap_or("missing");
    let has_results = body["results"].as_array().is_some_and(|r| !r.is_empty());
    if status != "OK" || !has_results {
        return Err(FetchError::ProviderStatus {
            provider: GEOCODING_PROVIDER,
            status: status.to_string(),
            message: body["error_message"].as_str().unwrap_or("no results").to_string(),
        });
    }

    let location = &body["results"][0]["geometry"]["location"];
    let (Some(lat), Some(lon)) = (location["lat"].as_f64(), location["lng"].as_f64()) else {
        return Err(FetchError::MissingField {
            provider: GEOCODING_PROVIDER,
            field: "results[0].geometry.location",
        });
    };

    Ok(GeoFix {
        lat,
        lon,
        provider: GEOCODING_PROVIDER.to_string(),
    })
}

/// OpenWeather current conditions: `main.temp` in the requested units.
pub fn parse_weather_response(body: &JsonValue) -> Result<WeatherReading, FetchError> {
    let temp_c = lenient_f64(&body["main"]["temp"]).ok_or(FetchError::MissingField {
        provider: WEATHER_PROVIDER,
        field: "main.temp",
    })?;

    Ok(WeatherReading {
        temp_c,
        provider: WEATHER_PROVIDER.to_string(),
    })
}

/// Open Notify: `message == "success"`, unix `timestamp`, string-encoded
/// coordinates.
pub fn parse_iss_response(body: &JsonValue) -> Result<IssFix, FetchError> {
    let message = body["message"].as_str().unwrap_or("missing");
    if message != "success" {
        return Err(FetchError::ProviderStatus {
            provider: ISS_PROVIDER,
            status: message.to_string(),
            message: "position unavailable".to_string(),
        });
    }

    let timestamp = body["timestamp"].as_i64().ok_or(FetchError::MissingField {
        provider: ISS_PROVIDER,
        field: "timestamp",
    })?;
    let lat = lenient_f64(&body["iss_position"]["latitude"]).ok_or(FetchError::MissingField {
        provider: ISS_PROVIDER,
        field: "iss_position.latitude",
    })?;
    let lon = lenient_f64(&body["iss_position"]["longitude"]).ok_or(FetchError::MissingField {
        provider: ISS_PROVIDER,
        field: "iss_position.longitude",
    })?;

    Ok(IssFix {
        sample: IssSample { lat, lon, timestamp },
        provider: ISS_PROVIDER.to_string(),
    })
}

/// ExchangeRate-API v6 pair endpoint: `result == "success"` and
/// `conversion_rate`.
pub fn parse_exchange_rate_response(
    body: &JsonValue,
    base: &str,
    quote: &str,
) -> Result<RateQuote, FetchError> {
    let result = body["result"].as_str().unwrap_or("missing");
    if result != "success" {
        return Err(FetchError::ProviderStatus {
            provider: EXCHANGE_RATE_PROVIDER,
            status: result.to_string(),
            message: body["error-type"].as_str().unwrap_or("unknown error").to_string(),
        });
    }

    let rate = lenient_f64(&body["conversion_rate"]).ok_or(FetchError::MissingField {
        provider: EXCHANGE_RATE_PROVIDER,
        field: "conversion_rate",
    })?;

    Ok(RateQuote {
        base: body["base_code"].as_str().unwrap_or(base).to_string(),
        quote: body["target_code"].as_str().unwrap_or(quote).to_string(),
        rate,
        time_last_update_unix: body["time_last_update_unix"].as_i64(),
        provider: EXCHANGE_RATE_PROVIDER.to_string(),
    })
}
