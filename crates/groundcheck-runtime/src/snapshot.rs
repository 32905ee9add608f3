//! Canonical snapshot builder.
//!
//! Fetches ground truth for every prompt of a manifest, one request at a
//! time, and freezes it into a [`CanonicalSnapshot`] shared by every model of
//! the run.

use std::fs;
use std::path::{Path, PathBuf};

use groundcheck_core::{
    CanonicalRecord, CanonicalSnapshot, IssCanonical, LocationCanonical, PromptManifest, PromptSpec,
    PromptTarget, RateCanonical, SnapshotEntry, Unverifiable, WeatherCanonical,
};
use thiserror::Error;

use crate::providers::{CanonicalSource, FetchError};

/// Errors building or persisting a snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Canonical fetch failed for prompt '{prompt}': {source}")]
    Fetch {
        prompt: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to read or write snapshot: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to (de)serialize snapshot: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// What to do when a prompt's canonical fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    /// Abort the whole build on the first failure.
    #[default]
    FailFast,
    /// Log and leave the prompt out; its validator will fail closed.
    SkipFailed,
}

/// Fetch the canonical record for one prompt.
pub async fn fetch_entry(
    prompt: &PromptSpec,
    source: &dyn CanonicalSource,
) -> Result<SnapshotEntry, FetchError> {
    let (query, canonical) = match &prompt.target {
        PromptTarget::Location { .. } => {
            let query = prompt.place_query().to_string();
            let geo = source.geocode(&query).await?;
            let record = CanonicalRecord::Location(LocationCanonical {
                lat: Some(geo.lat),
                lon: Some(geo.lon),
                provider: geo.provider,
            });
            (Some(query), record)
        }
        PromptTarget::Weather { .. } | PromptTarget::Temperature { .. } => {
            let query = prompt.place_query().to_string();
            let geo = source.geocode(&query).await?;
            let weather = source.current_weather(geo.lat, geo.lon).await?;
            let record = CanonicalRecord::Weather(WeatherCanonical {
                lat: Some(geo.lat),
                lon: Some(geo.lon),
                temp_c: Some(weather.temp_c),
                geo_provider: geo.provider,
                weather_provider: weather.provider,
            });
            (Some(query), record)
        }
        PromptTarget::Iss { .. } => {
            let fix = source.iss_position().await?;
            let record = CanonicalRecord::Iss(IssCanonical {
                lat: Some(fix.sample.lat),
                lon: Some(fix.sample.lon),
                timestamp: Some(fix.sample.timestamp),
                provider: fix.provider,
            });
            (None, record)
        }
        PromptTarget::ExchangeRate { base, quote, .. } => {
            let fx = source.exchange_rate(base, quote).await?;
            let record = CanonicalRecord::ExchangeRate(RateCanonical {
                base: fx.base,
                quote: fx.quote,
                rate: Some(fx.rate),
                provider: fx.provider,
                time_last_update_unix: fx.time_last_update_unix,
            });
            (Some(format!("{}/{}", base, quote)), record)
        }
        PromptTarget::Other { .. } => (None, CanonicalRecord::Unverifiable(Unverifiable {})),
    };

    Ok(SnapshotEntry {
        kind: prompt.kind(),
        query,
        canonical,
    })
}

/// Build the snapshot for every prompt in `manifest`.
pub async fn build_snapshot(
    manifest: &PromptManifest,
    source: &dyn CanonicalSource,
    policy: SnapshotPolicy,
) -> Result<CanonicalSnapshot, SnapshotError> {
    tracing::info!(
        version = %manifest.version,
        prompts = manifest.prompts.len(),
        source = source.name(),
        "Building canonical snapshot"
    );

    let mut snapshot = CanonicalSnapshot::new(manifest.version.clone());
    let mut skipped = 0usize;

    for prompt in &manifest.prompts {
        match fetch_entry(prompt, source).await {
            Ok(entry) => {
                tracing::debug!(
                    prompt = %prompt.name,
                    kind = %entry.kind,
                    "Captured canonical record"
                );
                snapshot.prompts.insert(prompt.name.clone(), entry);
            }
            Err(e) => match policy {
                SnapshotPolicy::FailFast => {
                    return Err(SnapshotError::Fetch {
                        prompt: prompt.name.clone(),
                        source: e,
                    })
                }
                SnapshotPolicy::SkipFailed => {
                    skipped += 1;
                    tracing::warn!(
                        prompt = %prompt.name,
                        error = %e,
                        "Canonical fetch failed, prompt left out of snapshot"
                    );
                }
            },
        }
    }

    tracing::info!(captured = snapshot.prompts.len(), skipped, "Canonical snapshot built");
    Ok(snapshot)
}

/// Write `snapshot` as `canonical_<version>.json` under `dir`.
pub fn save_snapshot(
    snapshot: &CanonicalSnapshot,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, SnapshotError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(snapshot.file_name());
    fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
    tracing::info!(path = %path.display(), "Snapshot written");
    Ok(path)
}

/// Read a persisted snapshot.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<CanonicalSnapshot, SnapshotError> {
    let contents = fs::read_to_string(path.as_ref())?;
    Ok(CanonicalSnapshot::from_json(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockSource;
    use groundcheck_core::{IssSample, PromptKind};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn manifest() -> PromptManifest {
        PromptManifest::from_json(
            r#"{
            "version": "v7",
            "prompts": [
                {"name": "eiffel", "type": "location", "text": "Coordinates of the Eiffel Tower?", "location": "Eiffel Tower"},
                {"name": "paris_temp", "type": "temperature", "text": "Temperature in Paris?", "location": "Paris"},
                {"name": "iss_now", "type": "iss", "text": "Where is the ISS?"},
                {"name": "usd_eur", "type": "exchange_rate", "text": "USD to EUR?"},
                {"name": "haiku", "type": "poem", "text": "Write a haiku."}
            ]
        }"#,
        )
        .unwrap()
    }

    fn source() -> MockSource {
        MockSource {
            places: HashMap::from([
                ("Eiffel Tower".to_string(), (48.8584, 2.2945)),
                ("Paris".to_string(), (48.8566, 2.3522)),
            ]),
            temp_c: Some(14.2),
            iss: Mutex::new(vec![IssSample {
                lat: 10.0,
                lon: 20.0,
                timestamp: 1_718_841_601,
            }]),
            rates: HashMap::from([(("USD".to_string(), "EUR".to_string()), 0.9312)]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_snapshot_dispatches_by_kind() {
        let source = source();
        let snapshot = build_snapshot(&manifest(), &source, SnapshotPolicy::FailFast)
            .await
            .unwrap();

        assert_eq!(snapshot.version, "v7");
        assert_eq!(snapshot.prompts.len(), 5);
        // location: 1, temperature: 2, iss: 1, fx: 1
        assert_eq!(source.calls(), 5);

        let weather = snapshot.entry("paris_temp").unwrap();
        assert_eq!(weather.kind, PromptKind::Temperature);
        assert_eq!(weather.query.as_deref(), Some("Paris"));
        let record = weather.canonical.as_weather().unwrap();
        assert_eq!(record.temp_c, Some(14.2));
        assert_eq!(record.lat, Some(48.8566));

        let fx = snapshot.entry("usd_eur").unwrap();
        assert_eq!(fx.query.as_deref(), Some("USD/EUR"));
        assert_eq!(fx.canonical.as_rate().unwrap().rate, Some(0.9312));

        let iss = snapshot.entry("iss_now").unwrap().canonical.as_iss().unwrap();
        assert_eq!(iss.timestamp, Some(1_718_841_601));

        let other = snapshot.entry("haiku").unwrap();
        assert_eq!(other.canonical, CanonicalRecord::Unverifiable(Unverifiable {}));
    }

    #[tokio::test]
    async fn test_fail_fast_names_prompt() {
        let mut source = source();
        source.temp_c = None;

        let err = build_snapshot(&manifest(), &source, SnapshotPolicy::FailFast)
            .await
            .unwrap_err();
        match err {
            SnapshotError::Fetch { prompt, .. } => assert_eq!(prompt, "paris_temp"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_failed_leaves_prompt_out() {
        let mut source = source();
        source.rates.clear();

        let snapshot = build_snapshot(&manifest(), &source, SnapshotPolicy::SkipFailed)
            .await
            .unwrap();
        assert_eq!(snapshot.prompts.len(), 4);
        assert!(snapshot.entry("usd_eur").is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let source = source();
        let snapshot = build_snapshot(&manifest(), &source, SnapshotPolicy::FailFast)
            .await
            .unwrap();

        let dir = std::env::temp_dir().join(format!("groundcheck-snapshot-{}", std::process::id()));
        let path = save_snapshot(&snapshot, &dir).unwrap();
        assert!(path.ends_with("canonical_v7.json"));

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot);

        fs::remove_dir_all(&dir).ok();
    }
}
