//! Validation verdicts.
//!
//! `valid` is tri-state: `Some(true)` and `Some(false)` are verified outcomes,
//! `None` means the claim could not be verified at all. Consumers must keep
//! `None` apart from `Some(false)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::IssSample;

/// Machine-readable reason attached to a gap or unverifiable verdict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NoTemperatureFound,
    NoCanonicalTemperature,
    NoCoordinatesFound,
    NoCanonicalCoordinates,
    NoRateFound,
    NoCanonicalRate,
    NoCanonicalIssSnapshot,
    UnverifiablePromptType,
    /// A reason code this build does not know, read from an older artifact.
    /// Kept verbatim so summaries still count it under its own name.
    #[serde(untagged)]
    Unrecognized(String),
}

impl Reason {
    pub fn as_str(&self) -> &str {
        match self {
            Reason::NoTemperatureFound => "no_temperature_found",
            Reason::NoCanonicalTemperature => "no_canonical_temperature",
            Reason::NoCoordinatesFound => "no_coordinates_found",
            Reason::NoCanonicalCoordinates => "no_canonical_coordinates",
            Reason::NoRateFound => "no_rate_found",
            Reason::NoCanonicalRate => "no_canonical_rate",
            Reason::NoCanonicalIssSnapshot => "no_canonical_iss_snapshot",
            Reason::UnverifiablePromptType => "unverifiable_prompt_type",
            Reason::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the expected satellite position was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionMethod {
    /// Evaluation time was within the grace window of the snapshot sample.
    SnapshotNearEval,
    /// Evaluation time fell between the two samples.
    Interpolated,
    /// Evaluation time was outside both samples; snapshot sample was nearer.
    #[serde(rename = "nearest_snapshot_0")]
    NearestSnapshot0,
    /// Evaluation time was outside both samples; fresh sample was nearer.
    #[serde(rename = "nearest_snapshot_1")]
    NearestSnapshot1,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDetail {
    pub expected_temp_c: f64,
    pub predicted_temp_c: f64,
    pub diff_c: f64,
    pub max_diff_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDetail {
    pub predicted_lat: f64,
    pub predicted_lon: f64,
    pub expected_lat: f64,
    pub expected_lon: f64,
    pub distance_km: f64,
    pub max_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateDetail {
    pub expected_rate: f64,
    pub predicted_rate: f64,
    pub diff: f64,
    pub max_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteDetail {
    pub predicted_lat: f64,
    pub predicted_lon: f64,
    pub expected_lat: f64,
    pub expected_lon: f64,
    pub method: PositionMethod,
    pub distance_km: f64,
    pub allowed_km: f64,
    pub delta_s: f64,
    pub eval_time_unix: f64,
    pub snapshot_0: IssSample,
    pub snapshot_1: IssSample,
}

/// Claim-specific verdict fields, flattened into the verdict object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerdictDetail {
    // Ordered most specific first: untagged matching takes the first fit.
    Satellite(SatelliteDetail),
    Location(LocationDetail),
    Weather(WeatherDetail),
    ExchangeRate(RateDetail),
}

/// Outcome of validating one final answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,

    #[serde(flatten)]
    pub detail: Option<VerdictDetail>,
}

impl Verdict {
    /// A verified comparison.
    pub fn checked(valid: bool, detail: VerdictDetail) -> Self {
        Self {
            valid: Some(valid),
            reason: None,
            detail: Some(detail),
        }
    }

    /// Verifiable in principle, but something needed was missing.
    pub fn gap(reason: Reason) -> Self {
        Self {
            valid: Some(false),
            reason: Some(reason),
            detail: None,
        }
    }

    /// Not verifiable at all.
    pub fn unverifiable(reason: Reason) -> Self {
        Self {
            valid: None,
            reason: Some(reason),
            detail: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid == Some(true)
    }

    pub fn is_verified(&self) -> bool {
        self.valid.is_some()
    }
}
