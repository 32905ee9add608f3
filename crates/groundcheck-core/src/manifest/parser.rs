//! Prompt manifest parsing from JSON/YAML.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::schema::validate_manifest_schema;
use crate::types::PromptKind;
use crate::validators::{IssTolerance, LocationTolerance, RateTolerance, WeatherTolerance};

/// Base currency when a prompt names none.
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Quote currency when a prompt names none.
pub const DEFAULT_QUOTE_CURRENCY: &str = "EUR";

/// Errors that can occur when loading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Manifest does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Manifest validation failed: {0}")]
    ValidationError(String),
}

/// What a prompt asks about, with only the fields that claim needs.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptTarget {
    Location {
        location: Option<String>,
        tolerance: LocationTolerance,
    },
    Weather {
        location: Option<String>,
        tolerance: WeatherTolerance,
    },
    Temperature {
        location: Option<String>,
        tolerance: WeatherTolerance,
    },
    Iss {
        tolerance: IssTolerance,
    },
    ExchangeRate {
        base: String,
        quote: String,
        tolerance: RateTolerance,
    },
    /// A prompt type this build cannot verify.
    Other {
        declared_type: String,
    },
}

impl PromptTarget {
    pub fn kind(&self) -> PromptKind {
        match self {
            PromptTarget::Location { .. } => PromptKind::Location,
            PromptTarget::Weather { .. } => PromptKind::Weather,
            PromptTarget::Temperature { .. } => PromptKind::Temperature,
            PromptTarget::Iss { .. } => PromptKind::Iss,
            PromptTarget::ExchangeRate { .. } => PromptKind::ExchangeRate,
            PromptTarget::Other { .. } => PromptKind::Other,
        }
    }
}

/// One prompt of the manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPromptSpec")]
pub struct PromptSpec {
    /// Unique key, also used in artifact file names.
    pub name: String,

    /// Prompt text sent to the model.
    pub text: String,

    pub target: PromptTarget,
}

impl PromptSpec {
    pub fn kind(&self) -> PromptKind {
        self.target.kind()
    }

    /// Place name to geocode: the explicit location, else the prompt text.
    pub fn place_query(&self) -> &str {
        match &self.target {
            PromptTarget::Location { location, .. }
            | PromptTarget::Weather { location, .. }
            | PromptTarget::Temperature { location, .. } => {
                location.as_deref().unwrap_or(&self.text)
            }
            _ => &self.text,
        }
    }
}

/// Wire shape of a prompt entry.
#[derive(Debug, Clone, Deserialize)]
struct RawPromptSpec {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    text: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    base_currency: Option<String>,
    #[serde(default)]
    quote_currency: Option<String>,
    #[serde(default)]
    validation: JsonValue,
}

impl TryFrom<RawPromptSpec> for PromptSpec {
    type Error = serde_json::Error;

    fn try_from(raw: RawPromptSpec) -> Result<Self, Self::Error> {
        let validation = if raw.validation.is_null() {
            JsonValue::Object(Default::default())
        } else {
            raw.validation
        };

        let declared = raw.kind.unwrap_or_default();
        let target = match declared.as_str() {
            "location" => PromptTarget::Location {
                location: raw.location,
                tolerance: serde_json::from_value(validation)?,
            },
            "weather" => PromptTarget::Weather {
                location: raw.location,
                tolerance: serde_json::from_value(validation)?,
            },
            "temperature" => PromptTarget::Temperature {
                location: raw.location,
                tolerance: serde_json::from_value(validation)?,
            },
            "iss" => PromptTarget::Iss {
                tolerance: serde_json::from_value(validation)?,
            },
            "exchange_rate" => PromptTarget::ExchangeRate {
                base: raw
                    .base_currency
                    .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string()),
                quote: raw
                    .quote_currency
                    .unwrap_or_else(|| DEFAULT_QUOTE_CURRENCY.to_string()),
                tolerance: serde_json::from_value(validation)?,
            },
            _ => PromptTarget::Other {
                declared_type: declared,
            },
        };

        Ok(Self {
            name: raw.name,
            text: raw.text,
            target,
        })
    }
}

/// A versioned set of prompts, loaded once per run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptManifest {
    #[serde(default = "default_version")]
    pub version: String,

    pub prompts: Vec<PromptSpec>,
}

fn default_version() -> String {
    "unknown".to_string()
}

impl PromptManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a manifest from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Load a manifest file; `.yaml`/`.yml` are read as YAML, anything else as
    /// JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading prompt manifest");
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    fn from_value(value: JsonValue) -> Result<Self, ManifestError> {
        validate_manifest_schema(&value).map_err(ManifestError::SchemaError)?;
        let manifest: PromptManifest = serde_json::from_value(value)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for prompt in &self.prompts {
            if !seen.insert(prompt.name.as_str()) {
                return Err(ManifestError::ValidationError(format!(
                    "Duplicate prompt name: {}",
                    prompt.name
                )));
            }
        }
        Ok(())
    }

    /// Find a prompt by name.
    pub fn prompt(&self, name: &str) -> Option<&PromptSpec> {
        self.prompts.iter().find(|p| p.name == name)
    }

    /// Prompt names in manifest order.
    pub fn prompt_names(&self) -> Vec<&str> {
        self.prompts.iter().map(|p| p.name.as_str()).collect()
    }
}
