//! Coordinate claims.

use serde::{Deserialize, Serialize};

use crate::extract::extract_lat_lon;
use crate::geo::{haversine_km, round_to};
use crate::types::LocationCanonical;
use crate::verdict::{LocationDetail, Reason, Verdict, VerdictDetail};

/// Allowed great-circle error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTolerance {
    #[serde(default = "default_max_km")]
    pub max_km: f64,
}

fn default_max_km() -> f64 {
    1.0
}

impl Default for LocationTolerance {
    fn default() -> Self {
        Self {
            max_km: default_max_km(),
        }
    }
}

/// Compare the coordinates in `final_text` to the canonical geocode.
pub fn validate_location(
    final_text: &str,
    canonical: &LocationCanonical,
    tolerance: &LocationTolerance,
) -> Verdict {
    let (Some(expected_lat), Some(expected_lon)) = (canonical.lat, canonical.lon) else {
        return Verdict::gap(Reason::NoCanonicalCoordinates);
    };

    let Some((lat, lon)) = extract_lat_lon(final_text) else {
        return Verdict::gap(Reason::NoCoordinatesFound);
    };

    let distance = haversine_km(lat, lon, expected_lat, expected_lon);

    Verdict::checked(
        distance <= tolerance.max_km,
        VerdictDetail::Location(LocationDetail {
            predicted_lat: lat,
            predicted_lon: lon,
            expected_lat,
            expected_lon,
            distance_km: round_to(distance, 3),
            max_km: tolerance.max_km,
        }),
    )
}
