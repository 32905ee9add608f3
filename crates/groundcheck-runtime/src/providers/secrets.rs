//! Credential handling for canonical providers.
//!
//! Keys are read once when [`FetchConfig`](crate::config::FetchConfig) is
//! built: from the config file first, then the provider's environment
//! variable. Fetchers never read the environment themselves.
//!
//! ```ignore
//! let key = ApiCredential::lookup(
//!     &config,
//!     "openweather_api_key",
//!     "OPENWEATHER_API_KEY",
//!     "OpenWeather API key",
//! );
//! let query = [("appid", key.expose())];
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
        }
    }
}

/// An API key that never shows up in `Debug` or `Display` output.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Look the key up in `config[config_key]`, then `env_var`.
    ///
    /// Empty strings count as unset. A missing key is not an error here: the
    /// fetcher that needs it reports it.
    pub fn lookup(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Option<Self> {
        let found = match config[config_key].as_str().filter(|v| !v.is_empty()) {
            Some(value) => Some(Self::new(value, CredentialSource::Config, name)),
            None => std::env::var(env_var)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| Self::new(v, CredentialSource::Environment, name)),
        };

        match &found {
            Some(credential) => tracing::debug!(credential = %credential, "API key loaded"),
            None => tracing::debug!(key = name, env_var, "API key not configured"),
        }
        found
    }

    /// Expose the key. Call only where the request is built.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted() {
        let secret = "owm-0123456789abcdef";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "OpenWeather API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert_eq!(display, "OpenWeather API key from config [REDACTED]");

        assert_eq!(cred.expose(), secret);
    }

    #[test]
    fn test_config_takes_precedence_over_env() {
        let config = serde_json::json!({ "openweather_api_key": "config-key" });

        std::env::set_var("GROUNDCHECK_TEST_KEY_PRIORITY", "env-key");
        let cred = ApiCredential::lookup(
            &config,
            "openweather_api_key",
            "GROUNDCHECK_TEST_KEY_PRIORITY",
            "Test key",
        )
        .unwrap();
        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.to_string(), "Test key from config [REDACTED]");
        std::env::remove_var("GROUNDCHECK_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_falls_back_to_env() {
        std::env::set_var("GROUNDCHECK_TEST_KEY_FALLBACK", "env-key");
        let cred = ApiCredential::lookup(
            &serde_json::json!({ "openweather_api_key": "" }),
            "openweather_api_key",
            "GROUNDCHECK_TEST_KEY_FALLBACK",
            "Test key",
        )
        .unwrap();
        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.to_string(), "Test key from environment [REDACTED]");
        std::env::remove_var("GROUNDCHECK_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_missing_key_is_none() {
        let cred = ApiCredential::lookup(
            &serde_json::json!({}),
            "exchange_rate_api_key",
            "GROUNDCHECK_TEST_KEY_UNSET_12345",
            "ExchangeRate-API key",
        );
        assert!(cred.is_none());
    }
}
