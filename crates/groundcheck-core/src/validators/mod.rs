//! Claim validators.
//!
//! Every validator has the same shape: final answer text, canonical record and
//! tolerance in, [`Verdict`] out. Missing inputs are verdicts with a reason,
//! never errors.
//!
//! Selection is an exhaustive match over [`PromptTarget`]. Satellite prompts
//! need a live sample taken at validation time, which this crate cannot fetch,
//! so [`begin_validation`] hands those back as [`ValidationStep::NeedsIssSample`]
//! once every snapshot-only check has passed.

mod exchange;
mod location;
mod satellite;
mod weather;

pub use exchange::{validate_exchange_rate, RateTolerance};
pub use location::{validate_location, LocationTolerance};
pub use satellite::{expected_position, validate_iss, ExpectedPosition, IssTolerance};
pub use weather::{validate_weather, WeatherTolerance};

use crate::extract::extract_lat_lon;
use crate::manifest::PromptTarget;
use crate::types::{CanonicalRecord, IssCanonical, IssSample};
use crate::verdict::{Reason, Verdict};

/// Result of the snapshot-only validation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationStep {
    /// The verdict is final.
    Complete(Verdict),

    /// A fresh satellite sample is required to finish.
    NeedsIssSample {
        canonical: IssCanonical,
        tolerance: IssTolerance,
    },
}

impl ValidationStep {
    /// Finish a pending satellite validation with a fresh sample.
    ///
    /// A complete step is returned unchanged.
    pub fn finish(self, final_text: &str, fresh: &IssSample, eval_time_unix: f64) -> Verdict {
        match self {
            ValidationStep::Complete(verdict) => verdict,
            ValidationStep::NeedsIssSample { canonical, tolerance } => {
                validate_iss(final_text, &canonical, fresh, eval_time_unix, &tolerance)
            }
        }
    }
}

/// Run every check that only needs the snapshot.
///
/// A missing or mismatched canonical record is treated as an empty record of
/// the right kind, so the validator fails closed with its own reason code.
pub fn begin_validation(
    target: &PromptTarget,
    final_text: &str,
    canonical: Option<&CanonicalRecord>,
) -> ValidationStep {
    let verdict = match target {
        PromptTarget::Location { tolerance, .. } => {
            let record = canonical.and_then(|c| c.as_location()).cloned().unwrap_or_default();
            validate_location(final_text, &record, tolerance)
        }
        PromptTarget::Weather { tolerance, .. } | PromptTarget::Temperature { tolerance, .. } => {
            let record = canonical.and_then(|c| c.as_weather()).cloned().unwrap_or_default();
            validate_weather(final_text, &record, tolerance)
        }
        PromptTarget::ExchangeRate { tolerance, .. } => {
            let record = canonical.and_then(|c| c.as_rate()).cloned().unwrap_or_default();
            validate_exchange_rate(final_text, &record, tolerance)
        }
        PromptTarget::Iss { tolerance } => {
            let record = canonical.and_then(|c| c.as_iss()).cloned().unwrap_or_default();
            if record.sample().is_none() {
                Verdict::gap(Reason::NoCanonicalIssSnapshot)
            } else if extract_lat_lon(final_text).is_none() {
                Verdict::gap(Reason::NoCoordinatesFound)
            } else {
                return ValidationStep::NeedsIssSample {
                    canonical: record,
                    tolerance: tolerance.clone(),
                };
            }
        }
        PromptTarget::Other { .. } => Verdict::unverifiable(Reason::UnverifiablePromptType),
    };

    ValidationStep::Complete(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LocationCanonical, WeatherCanonical};

    #[test]
    fn test_other_is_unverifiable() {
        let target = PromptTarget::Other {
            declared_type: "stock_price".to_string(),
        };
        match begin_validation(&target, "AAPL is 190.12", None) {
            ValidationStep::Complete(verdict) => {
                assert_eq!(verdict.valid, None);
                assert_eq!(verdict.reason, Some(Reason::UnverifiablePromptType));
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_record_fails_closed() {
        let target = PromptTarget::Weather {
            location: Some("Paris".to_string()),
            tolerance: WeatherTolerance::default(),
        };
        let wrong = CanonicalRecord::Location(LocationCanonical {
            lat: Some(48.85),
            lon: Some(2.35),
            provider: "google_geocoding".to_string(),
        });
        match begin_validation(&target, "It is 14°C", Some(&wrong)) {
            ValidationStep::Complete(verdict) => {
                assert_eq!(verdict.reason, Some(Reason::NoCanonicalTemperature))
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_temperature_uses_weather_validator() {
        let target = PromptTarget::Temperature {
            location: None,
            tolerance: WeatherTolerance::default(),
        };
        let record = CanonicalRecord::Weather(WeatherCanonical {
            temp_c: Some(14.0),
            ..Default::default()
        });
        match begin_validation(&target, "About 15 C", Some(&record)) {
            ValidationStep::Complete(verdict) => assert!(verdict.is_valid()),
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_iss_defers_only_when_checkable() {
        let target = PromptTarget::Iss {
            tolerance: IssTolerance::default(),
        };
        let record = CanonicalRecord::Iss(IssCanonical {
            lat: Some(10.0),
            lon: Some(20.0),
            timestamp: Some(1_000),
            provider: "open_notify".to_string(),
        });

        let pending = begin_validation(&target, "10.0°N 20.0°E", Some(&record));
        assert!(matches!(pending, ValidationStep::NeedsIssSample { .. }));

        let fresh = IssSample {
            lat: 11.0,
            lon: 22.0,
            timestamp: 1_100,
        };
        let verdict = pending.finish("10.0°N 20.0°E", &fresh, 1_000.0);
        assert!(verdict.is_valid());

        let no_coords = begin_validation(&target, "somewhere over the ocean", Some(&record));
        assert_eq!(
            no_coords,
            ValidationStep::Complete(Verdict::gap(Reason::NoCoordinatesFound))
        );

        let no_snapshot = begin_validation(&target, "10.0°N 20.0°E", None);
        assert_eq!(
            no_snapshot,
            ValidationStep::Complete(Verdict::gap(Reason::NoCanonicalIssSnapshot))
        );
    }
}
