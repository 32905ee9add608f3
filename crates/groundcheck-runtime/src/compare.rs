//! Framework comparison over persisted sidecars.
//!
//! Each framework gets its own run id: the one pinned by the caller, or the
//! run whose sidecars cover the most (model, prompt) pairs. An answer counts
//! only when both its sidecar and its transcript can be read; anything else is
//! reported as missing.

use std::collections::BTreeMap;
use std::path::PathBuf;

use groundcheck_core::{
    build_comparison, pinned_run, render_llm_prompt, render_markdown, select_run,
    ComparisonSummary, Framework, PromptManifest, RunOutcome, RunSelection,
};
use serde_json::json;
use thiserror::Error;

use crate::artifacts::{write_json, ArtifactError, ArtifactStore};

#[derive(Error, Debug)]
pub enum CompareError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Failed to write comparison report: {0}")]
    IoError(#[from] std::io::Error),
}

/// Where a comparison was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
    /// Instructions for turning the summary into a narrative report.
    pub llm_prompt: PathBuf,
    pub latest: PathBuf,
    pub latest_runtime: PathBuf,
}

/// Content of `latest_runtime_summary.json`. Runtime is not measured
/// directly; turn and tool-call counts in the summary stand in for it.
const RUNTIME_SUMMARY_NOTE: &str =
    "Use comparison summary metrics/tool-calls for runtime proxy in this version.";

/// Build the comparison for `models` over every prompt in `manifest`.
///
/// `overrides` pins the run id for a framework; frameworks without one use
/// their best-covered run.
pub fn compare_runs(
    store: &ArtifactStore,
    manifest: &PromptManifest,
    models: &[String],
    overrides: &BTreeMap<Framework, String>,
) -> Result<ComparisonSummary, CompareError> {
    let prompt_names: Vec<String> = manifest.prompts.iter().map(|p| p.name.clone()).collect();
    let target_pairs = models.len() * prompt_names.len();

    let mut runs: BTreeMap<Framework, RunSelection> = BTreeMap::new();
    let mut outcomes = Vec::new();

    for framework in Framework::ALL {
        let covered = store.validation_coverage(framework, models, &prompt_names)?;
        let selection = match overrides.get(&framework) {
            Some(run_id) => Some(pinned_run(&covered, run_id, target_pairs)),
            None => select_run(&covered, target_pairs),
        };
        let Some(selection) = selection else {
            tracing::warn!(%framework, "No validation sidecars found");
            continue;
        };

        tracing::info!(
            %framework,
            run_id = %selection.run_id,
            coverage = selection.coverage,
            "Selected run"
        );
        outcomes.extend(load_outcomes(store, framework, models, &prompt_names, &selection.run_id)?);
        runs.insert(framework, selection);
    }

    Ok(build_comparison(models, &prompt_names, &manifest.version, runs, &outcomes))
}

fn load_outcomes(
    store: &ArtifactStore,
    framework: Framework,
    models: &[String],
    prompt_names: &[String],
    run_id: &str,
) -> Result<Vec<RunOutcome>, CompareError> {
    let mut outcomes = Vec::new();

    for model in models {
        for prompt in prompt_names {
            let Some(record) = store.load_validation(framework, model, prompt, run_id)? else {
                continue;
            };
            // Models whose names sanitize alike share a folder.
            if &record.model != model {
                continue;
            }

            let path = store.transcript_path(framework, model, prompt, run_id);
            let transcript = match store.load_transcript(&path) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(
                        %framework,
                        model = %model,
                        prompt = %prompt,
                        error = %e,
                        "Sidecar without readable transcript"
                    );
                    continue;
                }
            };

            outcomes.push(RunOutcome::from_record(&record, &transcript));
        }
    }

    Ok(outcomes)
}

/// Write the summary as JSON and markdown under `<root>/analysis/` with the
/// report prompt next to them, and refresh the `latest_*` files at `<root>`.
pub fn write_comparison(
    store: &ArtifactStore,
    summary: &ComparisonSummary,
) -> Result<ComparisonPaths, CompareError> {
    let stamp = summary.metadata.generated_at.format("%Y%m%d_%H%M%S");
    let analysis = store.root().join("analysis");

    let json = analysis.join(format!("comparison_{}.json", stamp));
    write_json(&json, summary)?;

    let markdown = analysis.join(format!("comparison_{}.md", stamp));
    std::fs::write(&markdown, render_markdown(summary))?;

    let llm_prompt = analysis.join(format!("llm_report_prompt_{}.md", stamp));
    let prompt = render_llm_prompt(&json.display().to_string(), &markdown.display().to_string());
    std::fs::write(&llm_prompt, prompt)?;

    let latest = store.root().join("latest_comparison_summary.json");
    write_json(&latest, summary)?;

    let latest_runtime = store.root().join("latest_runtime_summary.json");
    write_json(&latest_runtime, &json!({ "note": RUNTIME_SUMMARY_NOTE }))?;

    tracing::info!(path = %json.display(), "Comparison written");
    Ok(ComparisonPaths {
        json,
        markdown,
        llm_prompt,
        latest,
        latest_runtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcheck_core::{
        DataHints, ProvenanceLabel, Reason, Transcript, ValidationRecord, Verdict,
    };

    fn manifest() -> PromptManifest {
        PromptManifest::from_json(
            r#"{
            "version": "v3",
            "prompts": [
                {"name": "a", "type": "exchange_rate", "text": "USD to EUR?"},
                {"name": "b", "type": "stock_price", "text": "AAPL?"}
            ]
        }"#,
        )
        .unwrap()
    }

    fn record(framework: Framework, prompt: &str, verdict: Verdict) -> ValidationRecord {
        ValidationRecord {
            model: "m".to_string(),
            framework,
            prompt_name: prompt.to_string(),
            prompt_version: "v3".to_string(),
            canonical: json!({}),
            tool_used: false,
            tool_names: Vec::new(),
            provenance: ProvenanceLabel::UnverifiedParametric,
            eval_time_unix: 0.0,
            data_hints: DataHints::default(),
            validation: verdict,
        }
    }

    fn transcript() -> Transcript {
        Transcript {
            messages: vec![
                json!({"role": "user", "content": "q"}),
                json!({"role": "assistant", "content": "answer"}),
            ],
            ..Default::default()
        }
    }

    fn store(tag: &str) -> ArtifactStore {
        let dir = format!("groundcheck-compare-{}-{}", tag, std::process::id());
        let root = std::env::temp_dir().join(dir);
        std::fs::remove_dir_all(&root).ok();
        ArtifactStore::new(root)
    }

    fn put(
        store: &ArtifactStore,
        framework: Framework,
        prompt: &str,
        run_id: &str,
        verdict: Verdict,
    ) {
        store
            .write_transcript(framework, "m", prompt, run_id, &transcript())
            .unwrap();
        put_sidecar(store, framework, prompt, run_id, verdict);
    }

    fn put_sidecar(
        store: &ArtifactStore,
        framework: Framework,
        prompt: &str,
        run_id: &str,
        verdict: Verdict,
    ) {
        store
            .write_validation(run_id, &record(framework, prompt, verdict))
            .unwrap();
    }

    fn models() -> Vec<String> {
        vec!["m".to_string()]
    }

    fn failed() -> Verdict {
        Verdict {
            valid: Some(false),
            reason: None,
            detail: None,
        }
    }

    fn passed() -> Verdict {
        Verdict {
            valid: Some(true),
            reason: None,
            detail: None,
        }
    }

    #[test]
    fn test_each_framework_uses_its_best_run() {
        let store = store("best");
        put(&store, Framework::Scratch, "a", "20240101_000000", failed());
        let unverifiable = Verdict::unverifiable(Reason::UnverifiablePromptType);
        put(&store, Framework::Scratch, "b", "20240101_000000", unverifiable);
        put(&store, Framework::Scratch, "a", "20240105_000000", passed());
        put(&store, Framework::Strands, "a", "20240102_000000", passed());

        let summary = compare_runs(&store, &manifest(), &models(), &BTreeMap::new()).unwrap();

        assert_eq!(summary.metadata.runs[&Framework::Scratch].run_id, "20240101_000000");
        assert_eq!(summary.metadata.runs[&Framework::Scratch].coverage, 1.0);
        assert_eq!(summary.metadata.runs[&Framework::Strands].run_id, "20240102_000000");

        assert_eq!(summary.overall.strands_wins, 1);
        assert_eq!(summary.missing.len(), 1);
        assert_eq!(summary.missing[0].framework, Framework::Strands);
        assert_eq!(summary.missing[0].prompt, "b");

        let scratch = &summary.by_model["m"].scratch;
        assert_eq!(scratch.runs, 2);
        assert_eq!(scratch.verified_runs, 1);
        assert_eq!(scratch.avg_assistant_turns, 1.0);
        assert_eq!(scratch.final_text_sources.get("messages"), Some(&2));
        assert_eq!(summary.pairwise[0].strands_final_text_source, "messages");

        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_override_and_missing_transcript() {
        let store = store("override");
        put(&store, Framework::Scratch, "a", "20240101_000000", failed());
        put(&store, Framework::Scratch, "b", "20240101_000000", failed());
        put(&store, Framework::Scratch, "a", "20240105_000000", passed());
        put_sidecar(&store, Framework::Strands, "a", "20240102_000000", passed());

        let overrides = BTreeMap::from([(Framework::Scratch, "20240105_000000".to_string())]);
        let summary = compare_runs(&store, &manifest(), &models(), &overrides).unwrap();

        let scratch_run = &summary.metadata.runs[&Framework::Scratch];
        assert_eq!(scratch_run.run_id, "20240105_000000");
        assert_eq!(scratch_run.best_pairs, 1);
        assert_eq!(summary.by_model["m"].scratch.valid_runs, 1);

        // The strands sidecar has no transcript, so nothing is paired.
        assert!(summary.pairwise.is_empty());
        assert_eq!(summary.missing.len(), 3);

        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_write_comparison() {
        let store = store("write");
        put(&store, Framework::Scratch, "a", "20240101_000000", passed());
        let summary = compare_runs(&store, &manifest(), &models(), &BTreeMap::new()).unwrap();

        let paths = write_comparison(&store, &summary).unwrap();
        assert!(paths.json.starts_with(store.root().join("analysis")));
        assert!(paths.markdown.extension().is_some_and(|e| e == "md"));

        let latest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.latest).unwrap()).unwrap();
        assert_eq!(latest["metadata"]["manifest_version"], "v3");
        let markdown = std::fs::read_to_string(&paths.markdown).unwrap();
        assert!(markdown.starts_with("# Framework Comparison"));

        let file_name = paths.llm_prompt.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("llm_report_prompt_"));
        let prompt = std::fs::read_to_string(&paths.llm_prompt).unwrap();
        assert!(prompt.contains(&paths.json.display().to_string()));
        assert!(prompt.contains(&paths.markdown.display().to_string()));

        let runtime: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.latest_runtime).unwrap()).unwrap();
        assert_eq!(runtime, json!({ "note": RUNTIME_SUMMARY_NOTE }));

        std::fs::remove_dir_all(store.root()).ok();
    }
}
