//! Satellite position claims.
//!
//! The target moves at roughly 7.66 km/s, so a single snapshot is stale by the
//! time the model answers. Validation brackets the evaluation instant with the
//! snapshot sample and a fresh sample taken at validation time, derives the
//! expected position from them, and widens the tolerance with the time gap to
//! the nearest sample.
//!
//! Longitude is interpolated linearly without correcting for the ±180° seam.
//! Historical verdicts were computed this way and must stay reproducible.

use serde::{Deserialize, Serialize};

use crate::extract::extract_lat_lon;
use crate::geo::{haversine_km, lerp, round_to};
use crate::types::{IssCanonical, IssSample};
use crate::verdict::{PositionMethod, Reason, SatelliteDetail, Verdict, VerdictDetail};

/// Time-dependent tolerance envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssTolerance {
    /// Window around the snapshot sample in which it is used as-is.
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: f64,

    /// Error allowed at zero elapsed time.
    #[serde(default = "default_base_km")]
    pub base_km: f64,

    /// Ground-track speed of the target.
    #[serde(default = "default_speed_kmps")]
    pub speed_kmps: f64,

    #[serde(default = "default_uncertainty_factor")]
    pub uncertainty_factor: f64,
}

fn default_grace_seconds() -> f64 {
    10.0
}

fn default_base_km() -> f64 {
    100.0
}

fn default_speed_kmps() -> f64 {
    7.66
}

fn default_uncertainty_factor() -> f64 {
    1.3
}

impl Default for IssTolerance {
    fn default() -> Self {
        Self {
            grace_seconds: default_grace_seconds(),
            base_km: default_base_km(),
            speed_kmps: default_speed_kmps(),
            uncertainty_factor: default_uncertainty_factor(),
        }
    }
}

impl IssTolerance {
    /// Allowed error after `delta_s` seconds of staleness.
    pub fn allowed_km(&self, delta_s: f64) -> f64 {
        self.base_km + self.speed_kmps * delta_s * self.uncertainty_factor
    }
}

/// Expected position at `eval_time_unix` and how it was derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedPosition {
    pub lat: f64,
    pub lon: f64,
    pub method: PositionMethod,
}

/// Derive the expected position from the snapshot sample `s0` and the fresh
/// sample `s1`.
pub fn expected_position(
    s0: &IssSample,
    s1: &IssSample,
    eval_time_unix: f64,
    grace_seconds: f64,
) -> ExpectedPosition {
    let t0 = s0.timestamp as f64;
    let t1 = s1.timestamp as f64;

    if (eval_time_unix - t0).abs() <= grace_seconds {
        return ExpectedPosition {
            lat: s0.lat,
            lon: s0.lon,
            method: PositionMethod::SnapshotNearEval,
        };
    }

    let (earliest, latest) = (t0.min(t1), t0.max(t1));
    if earliest <= eval_time_unix && eval_time_unix <= latest {
        let ratio = if t1 != t0 {
            (eval_time_unix - t0) / (t1 - t0)
        } else {
            0.0
        };
        return ExpectedPosition {
            lat: lerp(s0.lat, s1.lat, ratio),
            lon: lerp(s0.lon, s1.lon, ratio),
            method: PositionMethod::Interpolated,
        };
    }

    if (eval_time_unix - t0).abs() <= (eval_time_unix - t1).abs() {
        ExpectedPosition {
            lat: s0.lat,
            lon: s0.lon,
            method: PositionMethod::NearestSnapshot0,
        }
    } else {
        ExpectedPosition {
            lat: s1.lat,
            lon: s1.lon,
            method: PositionMethod::NearestSnapshot1,
        }
    }
}

/// Validate a position claim against the snapshot sample and a fresh sample.
pub fn validate_iss(
    final_text: &str,
    canonical: &IssCanonical,
    fresh: &IssSample,
    eval_time_unix: f64,
    tolerance: &IssTolerance,
) -> Verdict {
    let Some(snapshot) = canonical.sample() else {
        return Verdict::gap(Reason::NoCanonicalIssSnapshot);
    };

    let Some((lat, lon)) = extract_lat_lon(final_text) else {
        return Verdict::gap(Reason::NoCoordinatesFound);
    };

    let expected = expected_position(&snapshot, fresh, eval_time_unix, tolerance.grace_seconds);
    let distance = haversine_km(lat, lon, expected.lat, expected.lon);

    let delta_s = (eval_time_unix - snapshot.timestamp as f64)
        .abs()
        .min((eval_time_unix - fresh.timestamp as f64).abs());
    let allowed = tolerance.allowed_km(delta_s);

    Verdict::checked(
        distance <= allowed,
        VerdictDetail::Satellite(SatelliteDetail {
            predicted_lat: lat,
            predicted_lon: lon,
            expected_lat: expected.lat,
            expected_lon: expected.lon,
            method: expected.method,
            distance_km: round_to(distance, 3),
            allowed_km: round_to(allowed, 3),
            delta_s: round_to(delta_s, 3),
            eval_time_unix,
            snapshot_0: snapshot,
            snapshot_1: *fresh,
        }),
    )
}
