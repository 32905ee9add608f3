//! Extraction of typed quantities from unstructured model output.
//!
//! Extractors never fail: absence of a usable quantity is `None`, and the
//! validator turns that into a reason code.

mod hints;
pub mod patterns;

pub use hints::{extract_data_hints, DataHints};

use patterns::{DECIMAL_PATTERN, LATITUDE_PATTERN, LONGITUDE_PATTERN, TEMPERATURE_PATTERN};

/// Lowest magnitude accepted as an exchange rate.
pub const RATE_BAND_MIN: f64 = 0.0001;

/// Highest magnitude accepted as an exchange rate.
pub const RATE_BAND_MAX: f64 = 10.0;

/// Temperature unit as written in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a reading in this unit to degrees Celsius.
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

/// Extract the first temperature with its unit.
///
/// With several temperatures in the text only the first is returned.
pub fn extract_temperature(text: &str) -> Option<(f64, TemperatureUnit)> {
    let caps = TEMPERATURE_PATTERN.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = match caps.get(2)?.as_str() {
        "C" | "c" => TemperatureUnit::Celsius,
        _ => TemperatureUnit::Fahrenheit,
    };
    Some((value, unit))
}

/// Extract a latitude/longitude pair.
///
/// Hemisphere-suffixed numbers (`48.85°N, 2.35°E`) are preferred, with S and W
/// negated. Failing that, the first two decimal numbers in the text are taken
/// as `(lat, lon)` in that order.
pub fn extract_lat_lon(text: &str) -> Option<(f64, f64)> {
    let cardinal = (LATITUDE_PATTERN.captures(text), LONGITUDE_PATTERN.captures(text));
    if let (Some(lat), Some(lon)) = cardinal {
        let lat_value: Option<f64> = lat.get(1).and_then(|m| m.as_str().parse().ok());
        let lon_value: Option<f64> = lon.get(1).and_then(|m| m.as_str().parse().ok());
        if let (Some(lat_value), Some(lon_value)) = (lat_value, lon_value) {
            let lat_sign = if lat[2].eq_ignore_ascii_case("N") { 1.0 } else { -1.0 };
            let lon_sign = if lon[2].eq_ignore_ascii_case("E") { 1.0 } else { -1.0 };
            return Some((lat_value * lat_sign, lon_value * lon_sign));
        }
    }

    let mut decimals = DECIMAL_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok());
    let lat = decimals.next()?;
    let lon = decimals.next()?;
    Some((lat, lon))
}

/// Extract the first decimal whose magnitude lies in the plausible FX band.
///
/// Years, counts and other bare integers are never decimals and so are
/// skipped outright.
pub fn extract_rate(text: &str) -> Option<f64> {
    DECIMAL_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .find(|v| (RATE_BAND_MIN..=RATE_BAND_MAX).contains(&v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_temperature_celsius() {
        assert_eq!(
            extract_temperature("It's 22°C in Paris."),
            Some((22.0, TemperatureUnit::Celsius))
        );
    }

    #[test]
    fn test_temperature_first_match_wins() {
        assert_eq!(
            extract_temperature("High of 75°F, low of 10°C"),
            Some((75.0, TemperatureUnit::Fahrenheit))
        );
    }

    #[test]
    fn test_temperature_negative_lowercase() {
        assert_eq!(
            extract_temperature("currently -4.5 c"),
            Some((-4.5, TemperatureUnit::Celsius))
        );
    }

    #[test]
    fn test_temperature_absent() {
        assert_eq!(extract_temperature("no temperature here"), None);
    }

    #[test]
    fn test_lat_lon_with_hemispheres() {
        assert_eq!(
            extract_lat_lon("The Eiffel Tower is at 48.8584° N, 2.2945° E."),
            Some((48.8584, 2.2945))
        );
    }

    #[test]
    fn test_lat_lon_southern_western_negated() {
        assert_eq!(
            extract_lat_lon("Rio: 22.9068°S 43.1729°W"),
            Some((-22.9068, -43.1729))
        );
    }

    #[test]
    fn test_lat_lon_decimal_fallback() {
        assert_eq!(
            extract_lat_lon("coordinates: -33.8688, 151.2093"),
            Some((-33.8688, 151.2093))
        );
    }

    #[test]
    fn test_lat_lon_needs_two_numbers() {
        assert_eq!(extract_lat_lon("only 12.5 here"), None);
    }

    #[test]
    fn test_rate_skips_out_of_band() {
        assert_eq!(
            extract_rate("As of 2024, 1 USD buys 0.93 EUR"),
            Some(0.93)
        );
        assert_eq!(extract_rate("Price is 149.50 yen, rate 0.0067"), Some(0.0067));
    }

    #[test]
    fn test_rate_absent() {
        assert_eq!(extract_rate("In 2024 the rate moved a lot"), None);
    }

    proptest! {
        #[test]
        fn prop_celsius_identity(v in -100.0f64..100.0) {
            prop_assert_eq!(TemperatureUnit::Celsius.to_celsius(v), v);
        }

        #[test]
        fn prop_fahrenheit_formula(v in -100.0f64..200.0) {
            let expected = (v - 32.0) * 5.0 / 9.0;
            prop_assert!((TemperatureUnit::Fahrenheit.to_celsius(v) - expected).abs() < 1e-12);
        }
    }
}
