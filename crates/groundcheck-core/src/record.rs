//! Validation sidecar written next to every transcript.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::extract::DataHints;
use crate::provenance::ProvenanceLabel;
use crate::transcript::Framework;
use crate::verdict::Verdict;

/// Everything known about one (framework, model, prompt, run) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub model: String,
    pub framework: Framework,
    pub prompt_name: String,
    pub prompt_version: String,

    /// The snapshot record the answer was graded against, as stored.
    #[serde(default)]
    pub canonical: JsonValue,

    pub tool_used: bool,
    #[serde(default)]
    pub tool_names: Vec<String>,
    pub provenance: ProvenanceLabel,
    pub eval_time_unix: f64,
    #[serde(default)]
    pub data_hints: DataHints,
    pub validation: Verdict,
}
