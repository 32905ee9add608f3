//! Exchange-rate claims.

use serde::{Deserialize, Serialize};

use crate::extract::extract_rate;
use crate::geo::round_to;
use crate::types::RateCanonical;
use crate::verdict::{RateDetail, Reason, Verdict, VerdictDetail};

/// Allowed absolute rate error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTolerance {
    #[serde(default = "default_max_diff")]
    pub max_diff: f64,
}

fn default_max_diff() -> f64 {
    0.02
}

impl Default for RateTolerance {
    fn default() -> Self {
        Self {
            max_diff: default_max_diff(),
        }
    }
}

/// Compare the first in-band decimal in `final_text` to the canonical rate.
pub fn validate_exchange_rate(
    final_text: &str,
    canonical: &RateCanonical,
    tolerance: &RateTolerance,
) -> Verdict {
    let Some(expected_rate) = canonical.rate else {
        return Verdict::gap(Reason::NoCanonicalRate);
    };

    let Some(predicted_rate) = extract_rate(final_text) else {
        return Verdict::gap(Reason::NoRateFound);
    };

    let diff = (predicted_rate - expected_rate).abs();

    Verdict::checked(
        diff <= tolerance.max_diff,
        VerdictDetail::ExchangeRate(RateDetail {
            expected_rate,
            predicted_rate,
            diff: round_to(diff, 6),
            max_diff: tolerance.max_diff,
        }),
    )
}
