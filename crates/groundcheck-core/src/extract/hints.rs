//! Best-effort time hints from raw tool output.
//!
//! Hints are diagnostic only. They record when the data a tool returned was
//! stamped, which helps explain a failed verdict, but they never feed a
//! pass/fail decision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::patterns::{DATE_PATTERN, ISO_DATETIME_PATTERN, LABELED_TIME_PATTERN, UNIX_EPOCH_PATTERN};

/// Maximum values kept per hint category.
const MAX_HINTS: usize = 10;

/// Time hints found in tool output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataHints {
    #[serde(default)]
    pub iso_datetimes: Vec<String>,

    #[serde(default)]
    pub dates: Vec<String>,

    /// Field name to the distinct values seen for it.
    #[serde(default)]
    pub labeled: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub unix_timestamps: Vec<i64>,
}

impl DataHints {
    pub fn is_empty(&self) -> bool {
        self.iso_datetimes.is_empty()
            && self.dates.is_empty()
            && self.labeled.is_empty()
            && self.unix_timestamps.is_empty()
    }
}

/// Scan a set of tool-output blobs for time hints.
pub fn extract_data_hints<S: AsRef<str>>(blobs: &[S]) -> DataHints {
    let mut iso = Vec::new();
    let mut dates = Vec::new();
    let mut labeled: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut epochs = Vec::new();

    for blob in blobs {
        let text = blob.as_ref();

        for m in ISO_DATETIME_PATTERN.find_iter(text) {
            push_unique(&mut iso, m.as_str().to_string());
        }

        // Dates inside datetimes are already covered above.
        let without_datetimes = ISO_DATETIME_PATTERN.replace_all(text, " ");
        for m in DATE_PATTERN.find_iter(&without_datetimes) {
            push_unique(&mut dates, m.as_str().to_string());
        }

        for caps in LABELED_TIME_PATTERN.captures_iter(text) {
            let field = caps[1].to_lowercase();
            let value = caps[2].trim().to_string();
            if value.is_empty() {
                continue;
            }
            push_unique(labeled.entry(field).or_default(), value);
        }

        for m in UNIX_EPOCH_PATTERN.find_iter(text) {
            if let Ok(epoch) = m.as_str().parse::<i64>() {
                push_unique(&mut epochs, epoch);
            }
        }
    }

    DataHints {
        iso_datetimes: iso,
        dates,
        labeled,
        unix_timestamps: epochs,
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if values.len() < MAX_HINTS && !values.contains(&value) {
        values.push(value);
    }
}
