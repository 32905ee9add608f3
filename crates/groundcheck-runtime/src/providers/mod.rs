//! Canonical data providers.
//!
//! This module defines the trait the snapshot builder and evaluator fetch
//! ground truth through, and the HTTP implementation backed by Google
//! Geocoding, OpenWeather, Open Notify and ExchangeRate-API.
//!
//! ## Security
//!
//! API keys are held as [`ApiCredential`]s and only exposed when a request
//! URL is built.

use async_trait::async_trait;
use groundcheck_core::IssSample;
use std::time::Duration;
use thiserror::Error;

mod http;
pub mod secrets;

pub use http::{
    parse_exchange_rate_response, parse_geocode_response, parse_iss_response,
    parse_weather_response, HttpCanonicalSource,
};
pub use secrets::{ApiCredential, CredentialSource};

/// Provider label recorded for geocodes.
pub const GEOCODING_PROVIDER: &str = "google_geocoding";
/// Provider label recorded for temperatures.
pub const WEATHER_PROVIDER: &str = "openweather";
/// Provider label recorded for satellite positions.
pub const ISS_PROVIDER: &str = "open_notify";
/// Provider label recorded for exchange rates.
pub const EXCHANGE_RATE_PROVIDER: &str = "exchangerate_api";

/// Errors from canonical providers.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// The provider answered, but its envelope reports a failure.
    #[error("{provider} returned {status}: {message}")]
    ProviderStatus {
        provider: &'static str,
        status: String,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("{provider} response missing {field}")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },
}

/// A geocoded point.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFix {
    pub lat: f64,
    pub lon: f64,
    pub provider: String,
}

/// Current temperature at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temp_c: f64,
    pub provider: String,
}

/// A live satellite position.
#[derive(Debug, Clone, PartialEq)]
pub struct IssFix {
    pub sample: IssSample,
    pub provider: String,
}

/// A currency pair quote.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub base: String,
    pub quote: String,
    pub rate: f64,
    pub time_last_update_unix: Option<i64>,
    pub provider: String,
}

/// Source of ground truth.
///
/// Each method performs exactly one upstream request. Implementations never
/// retry; callers decide what a failure means for their batch.
#[async_trait]
pub trait CanonicalSource: Send + Sync {
    /// Resolve a place name to coordinates.
    async fn geocode(&self, query: &str) -> Result<GeoFix, FetchError>;

    /// Current temperature in Celsius at a point.
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherReading, FetchError>;

    /// Current satellite ground position.
    async fn iss_position(&self) -> Result<IssFix, FetchError>;

    /// Latest rate for `base` → `quote`.
    async fn exchange_rate(&self, base: &str, quote: &str) -> Result<RateQuote, FetchError>;

    /// Source name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory source for builder and evaluator tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockSource {
        pub places: HashMap<String, (f64, f64)>,
        pub temp_c: Option<f64>,
        /// Returned in order; the last one repeats.
        pub iss: Mutex<Vec<IssSample>>,
        pub rates: HashMap<(String, String), f64>,
        pub calls: AtomicUsize,
    }

    impl MockSource {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CanonicalSource for MockSource {
        async fn geocode(&self, query: &str) -> Result<GeoFix, FetchError> {
            self.hit();
            let (lat, lon) = self
                .places
                .get(query)
                .copied()
                .ok_or_else(|| FetchError::ProviderStatus {
                    provider: GEOCODING_PROVIDER,
                    status: "ZERO_RESULTS".to_string(),
                    message: query.to_string(),
                })?;
            Ok(GeoFix {
                lat,
                lon,
                provider: GEOCODING_PROVIDER.to_string(),
            })
        }

        async fn current_weather(
            &self,
            _lat: f64,
            _lon: f64,
        ) -> Result<WeatherReading, FetchError> {
            self.hit();
            let temp_c = self.temp_c.ok_or(FetchError::MissingField {
                provider: WEATHER_PROVIDER,
                field: "main.temp",
            })?;
            Ok(WeatherReading {
                temp_c,
                provider: WEATHER_PROVIDER.to_string(),
            })
        }

        async fn iss_position(&self) -> Result<IssFix, FetchError> {
            self.hit();
            let mut samples = self.iss.lock().unwrap();
            let sample = match samples.len() {
                0 => return Err(FetchError::HttpError("connection refused".to_string())),
                1 => samples[0],
                _ => samples.remove(0),
            };
            Ok(IssFix {
                sample,
                provider: ISS_PROVIDER.to_string(),
            })
        }

        async fn exchange_rate(&self, base: &str, quote: &str) -> Result<RateQuote, FetchError> {
            self.hit();
            let rate = self
                .rates
                .get(&(base.to_string(), quote.to_string()))
                .copied()
                .ok_or_else(|| FetchError::ProviderStatus {
                    provider: EXCHANGE_RATE_PROVIDER,
                    status: "error".to_string(),
                    message: "unsupported-code".to_string(),
                })?;
            Ok(RateQuote {
                base: base.to_string(),
                quote: quote.to_string(),
                rate,
                time_last_update_unix: Some(1_718_841_601),
                provider: EXCHANGE_RATE_PROVIDER.to_string(),
            })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_provider() {
        let err = FetchError::ProviderStatus {
            provider: GEOCODING_PROVIDER,
            status: "REQUEST_DENIED".to_string(),
            message: "The provided API key is invalid.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "google_geocoding returned REQUEST_DENIED: The provided API key is invalid."
        );

        let err = FetchError::MissingField {
            provider: WEATHER_PROVIDER,
            field: "main.temp",
        };
        assert_eq!(err.to_string(), "openweather response missing main.temp");
    }
}
