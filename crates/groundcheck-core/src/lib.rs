//! # groundcheck-core
//!
//! Deterministic grounding checks for time-sensitive LLM answers.
//!
//! Given a model's final answer and a canonical record captured from a live
//! provider, this crate answers:
//! - Did the answer state the right fact, within tolerance?
//! - If not, was it verifiably wrong or simply unverifiable?
//! - Did the agent reach the answer with a tool, or from memory?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: no network access and no clock reads in validation
//! 2. **Fail closed**: a missing canonical value is `valid: false` with a reason
//! 3. **Tri-state**: unverifiable answers carry `valid: null`, never `false`
//!
//! ## Example
//!
//! ```rust,ignore
//! use groundcheck_core::{begin_validation, PromptManifest, ValidationStep};
//!
//! let manifest = PromptManifest::from_file("prompts.json")?;
//! let prompt = manifest.prompt("paris_weather").unwrap();
//! let canonical = snapshot.entry(&prompt.name).map(|e| &e.canonical);
//!
//! match begin_validation(&prompt.target, "It is 14°C in Paris.", canonical) {
//!     ValidationStep::Complete(verdict) => println!("valid: {:?}", verdict.valid),
//!     ValidationStep::NeedsIssSample { .. } => println!("fetch a fresh ISS sample"),
//! }
//! ```

pub mod extract;
pub mod geo;
pub mod manifest;
pub mod provenance;
pub mod record;
pub mod report;
pub mod transcript;
pub mod types;
pub mod validators;
pub mod verdict;

// Re-export main types at crate root
pub use extract::{
    extract_data_hints, extract_lat_lon, extract_rate, extract_temperature, DataHints,
    TemperatureUnit,
};
pub use manifest::{ManifestError, PromptManifest, PromptSpec, PromptTarget};
pub use provenance::{classify_provenance, ProvenanceLabel};
pub use record::ValidationRecord;
pub use report::{
    build_comparison, pinned_run, render_llm_prompt, render_markdown, select_run,
    ComparisonSummary, RunOutcome, RunSelection, LEGACY_RUN_ID,
};
pub use transcript::{
    derive_final_text, detect_tool_use, tool_outputs, transcript_metrics, Framework, ToolUse,
    Transcript, TranscriptFile, TranscriptMetrics,
};
pub use types::{
    sanitize_path_component, CanonicalRecord, CanonicalSnapshot, IssCanonical, IssSample,
    LocationCanonical, PromptKind, RateCanonical, SnapshotEntry, Unverifiable, WeatherCanonical,
};
pub use validators::{begin_validation, ValidationStep};
pub use verdict::{Reason, Verdict, VerdictDetail};
