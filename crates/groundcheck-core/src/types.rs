//! Canonical ground-truth records and the per-run snapshot.
//!
//! A snapshot is built once per evaluation run and reused for every model in
//! that run, so all models are graded against the same reference instant.
//! Numeric truth fields are optional: a record read back from disk with a
//! field missing must make its validator fail closed, never read as zero.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

lazy_static! {
    static ref PATH_COMPONENT_STRIP: Regex = Regex::new(r"[^-\w.]").unwrap();
}

/// Turn an arbitrary label into one safe file-name component.
///
/// Spaces become `_` and anything outside `[-\w.]` is dropped. A result that
/// is empty or only dots would name the current or parent directory, so it is
/// prefixed with `_`.
pub fn sanitize_path_component(raw: &str) -> String {
    let cleaned = PATH_COMPONENT_STRIP
        .replace_all(&raw.trim().replace(' ', "_"), "")
        .into_owned();
    if cleaned.chars().all(|c| c == '.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// The claim type a prompt asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Location,
    Weather,
    Temperature,
    Iss,
    ExchangeRate,
    /// Anything else. Unverifiable, not an error.
    #[serde(other)]
    Other,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Location => "location",
            PromptKind::Weather => "weather",
            PromptKind::Temperature => "temperature",
            PromptKind::Iss => "iss",
            PromptKind::ExchangeRate => "exchange_rate",
            PromptKind::Other => "other",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical coordinates for a place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationCanonical {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub provider: String,
}

/// Canonical current temperature at a geocoded point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherCanonical {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub geo_provider: String,
    #[serde(default)]
    pub weather_provider: String,
}

/// One timestamped satellite ground position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssCanonical {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Unix seconds of the sample.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub provider: String,
}

impl IssCanonical {
    /// The complete sample, or `None` if any field is missing.
    pub fn sample(&self) -> Option<IssSample> {
        Some(IssSample {
            lat: self.lat?,
            lon: self.lon?,
            timestamp: self.timestamp?,
        })
    }
}

/// A complete satellite position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IssSample {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: i64,
}

/// Canonical exchange rate between two currencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateCanonical {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub time_last_update_unix: Option<i64>,
}

/// Empty record for prompt kinds that cannot be verified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unverifiable {}

/// Reference truth for one prompt. Serialized as the bare record object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalRecord {
    Location(LocationCanonical),
    /// Used for both `weather` and `temperature` prompts.
    Weather(WeatherCanonical),
    Iss(IssCanonical),
    ExchangeRate(RateCanonical),
    Unverifiable(Unverifiable),
}

impl CanonicalRecord {
    pub fn as_location(&self) -> Option<&LocationCanonical> {
        match self {
            CanonicalRecord::Location(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_weather(&self) -> Option<&WeatherCanonical> {
        match self {
            CanonicalRecord::Weather(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_iss(&self) -> Option<&IssCanonical> {
        match self {
            CanonicalRecord::Iss(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_rate(&self) -> Option<&RateCanonical> {
        match self {
            CanonicalRecord::ExchangeRate(r) => Some(r),
            _ => None,
        }
    }

    /// Interpret a raw `canonical` object according to the prompt kind.
    pub fn from_json(kind: PromptKind, value: JsonValue) -> Result<Self, serde_json::Error> {
        // A missing object reads as an empty record so validators fail closed.
        let value = if value.is_null() {
            JsonValue::Object(Default::default())
        } else {
            value
        };

        Ok(match kind {
            PromptKind::Location => CanonicalRecord::Location(serde_json::from_value(value)?),
            PromptKind::Weather | PromptKind::Temperature => {
                CanonicalRecord::Weather(serde_json::from_value(value)?)
            }
            PromptKind::Iss => CanonicalRecord::Iss(serde_json::from_value(value)?),
            PromptKind::ExchangeRate => {
                CanonicalRecord::ExchangeRate(serde_json::from_value(value)?)
            }
            PromptKind::Other => CanonicalRecord::Unverifiable(Unverifiable {}),
        })
    }
}

/// One prompt's entry in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshotEntry")]
pub struct SnapshotEntry {
    #[serde(rename = "type")]
    pub kind: PromptKind,

    /// The query sent to the provider (place name, currency pair).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    pub canonical: CanonicalRecord,
}

#[derive(Deserialize)]
struct RawSnapshotEntry {
    #[serde(rename = "type")]
    kind: PromptKind,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    canonical: JsonValue,
}

impl TryFrom<RawSnapshotEntry> for SnapshotEntry {
    type Error = serde_json::Error;

    fn try_from(raw: RawSnapshotEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: raw.kind,
            query: raw.query,
            canonical: CanonicalRecord::from_json(raw.kind, raw.canonical)?,
        })
    }
}

/// Ground truth for every prompt of a manifest, captured once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSnapshot {
    /// Manifest version the snapshot was built from.
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub prompts: BTreeMap<String, SnapshotEntry>,
}

impl CanonicalSnapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            generated_at: Some(Utc::now()),
            prompts: BTreeMap::new(),
        }
    }

    /// Look up a prompt's entry.
    pub fn entry(&self, prompt_name: &str) -> Option<&SnapshotEntry> {
        self.prompts.get(prompt_name)
    }

    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Conventional file name for a persisted snapshot.
    pub fn file_name(&self) -> String {
        format!("canonical_{}.json", sanitize_path_component(&self.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_component() {
        assert_eq!(sanitize_path_component("gpt-4o mini"), "gpt-4o_mini");
        assert_eq!(sanitize_path_component("../x"), "..x");
        assert_eq!(sanitize_path_component(".."), "_..");
        assert_eq!(sanitize_path_component("."), "_.");
        assert_eq!(sanitize_path_component(""), "_");
        assert_eq!(sanitize_path_component("/"), "_");
    }

    #[test]
    fn test_snapshot_file_name_stays_in_directory() {
        assert_eq!(CanonicalSnapshot::new("v3").file_name(), "canonical_v3.json");
        assert_eq!(CanonicalSnapshot::new("../../etc/x").file_name(), "canonical_....etcx.json");
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let kind: PromptKind = serde_json::from_str(r#""stock_price""#).unwrap();
        assert_eq!(kind, PromptKind::Other);
        let kind: PromptKind = serde_json::from_str(r#""exchange_rate""#).unwrap();
        assert_eq!(kind, PromptKind::ExchangeRate);
    }

    #[test]
    fn test_snapshot_entry_reads_flat_record() {
        let entry: SnapshotEntry = serde_json::from_value(serde_json::json!({
            "type": "weather",
            "query": "Paris, France",
            "canonical": {
                "lat": 48.8566,
                "lon": 2.3522,
                "temp_c": 14.2,
                "geo_provider": "google_geocoding",
                "weather_provider": "openweather"
            }
        }))
        .unwrap();

        let weather = entry.canonical.as_weather().unwrap();
        assert_eq!(weather.temp_c, Some(14.2));
        assert_eq!(weather.weather_provider, "openweather");
    }

    #[test]
    fn test_missing_fields_stay_missing() {
        let entry: SnapshotEntry = serde_json::from_value(serde_json::json!({
            "type": "location",
            "canonical": { "lon": 2.35 }
        }))
        .unwrap();

        let location = entry.canonical.as_location().unwrap();
        assert_eq!(location.lat, None);
        assert_eq!(location.lon, Some(2.35));
    }

    #[test]
    fn test_other_serializes_as_empty_object() {
        let entry = SnapshotEntry {
            kind: PromptKind::Other,
            query: None,
            canonical: CanonicalRecord::Unverifiable(Unverifiable {}),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "other");
        assert_eq!(value["canonical"], serde_json::json!({}));
    }

    #[test]
    fn test_iss_sample_requires_all_fields() {
        let partial = IssCanonical {
            lat: Some(10.0),
            lon: Some(20.0),
            timestamp: None,
            provider: "open_notify".to_string(),
        };
        assert!(partial.sample().is_none());
    }
}
