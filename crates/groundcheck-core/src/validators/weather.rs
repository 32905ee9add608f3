//! Temperature claims.

use serde::{Deserialize, Serialize};

use crate::extract::extract_temperature;
use crate::geo::round_to;
use crate::types::WeatherCanonical;
use crate::verdict::{Reason, Verdict, VerdictDetail, WeatherDetail};

/// Allowed temperature error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherTolerance {
    #[serde(default = "default_max_diff_c")]
    pub max_diff_c: f64,
}

fn default_max_diff_c() -> f64 {
    3.0
}

impl Default for WeatherTolerance {
    fn default() -> Self {
        Self {
            max_diff_c: default_max_diff_c(),
        }
    }
}

/// Compare the first temperature in `final_text` to the canonical reading.
pub fn validate_weather(
    final_text: &str,
    canonical: &WeatherCanonical,
    tolerance: &WeatherTolerance,
) -> Verdict {
    let Some((observed, unit)) = extract_temperature(final_text) else {
        return Verdict::gap(Reason::NoTemperatureFound);
    };

    let Some(expected_temp_c) = canonical.temp_c else {
        return Verdict::gap(Reason::NoCanonicalTemperature);
    };

    let predicted_temp_c = unit.to_celsius(observed);
    let diff_c = (predicted_temp_c - expected_temp_c).abs();

    Verdict::checked(
        diff_c <= tolerance.max_diff_c,
        VerdictDetail::Weather(WeatherDetail {
            expected_temp_c,
            predicted_temp_c: round_to(predicted_temp_c, 2),
            diff_c: round_to(diff_c, 2),
            max_diff_c: tolerance.max_diff_c,
        }),
    )
}
