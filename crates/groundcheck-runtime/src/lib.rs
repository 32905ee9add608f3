//! # groundcheck-runtime
//!
//! Network and filesystem side of groundcheck.
//!
//! `groundcheck-core` decides whether an answer is grounded; this crate
//! gathers what it needs to decide:
//!
//! - **providers**: canonical sources (geocoding, weather, satellite position,
//!   exchange rates) behind the [`CanonicalSource`] trait
//! - **snapshot**: fetch ground truth once per run and persist it
//! - **evaluator**: validate transcripts and write validation sidecars
//! - **artifacts**: the on-disk layout of transcripts and sidecars
//! - **compare**: framework comparison over the persisted sidecars
//!
//! ## Key Guarantees
//!
//! - Requests are issued one at a time, in manifest order
//! - API keys never appear in `Debug` or log output
//! - A failed item is logged and skipped; the batch continues
//!
//! ## Example
//!
//! ```rust,ignore
//! use groundcheck_runtime::{
//!     build_snapshot, Evaluator, FetchConfig, HttpCanonicalSource, SnapshotPolicy,
//! };
//!
//! let source = HttpCanonicalSource::new(FetchConfig::from_env()?)?;
//! let snapshot = build_snapshot(&manifest, &source, SnapshotPolicy::FailFast).await?;
//!
//! let evaluator = Evaluator::new(&manifest, &snapshot, &source);
//! let report = evaluator.evaluate_run(&store, Framework::Scratch, &models, &run_id).await;
//! ```

pub mod artifacts;
pub mod compare;
pub mod config;
pub mod evaluator;
pub mod providers;
pub mod snapshot;

pub use artifacts::{new_run_id, sanitize_model_folder, ArtifactError, ArtifactStore, TranscriptRef};
pub use compare::{compare_runs, write_comparison, CompareError, ComparisonPaths};
pub use config::{ConfigError, FetchConfig};
pub use evaluator::{now_unix, EvalError, Evaluator, RunReport};
pub use providers::{
    ApiCredential, CanonicalSource, CredentialSource, FetchError, GeoFix, HttpCanonicalSource,
    IssFix, RateQuote, WeatherReading,
};
pub use snapshot::{
    build_snapshot, fetch_entry, load_snapshot, save_snapshot, SnapshotError, SnapshotPolicy,
};
