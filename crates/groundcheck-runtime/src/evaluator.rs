//! Transcript evaluation.
//!
//! For each transcript: derive the final answer, validate it against the run's
//! snapshot (fetching a fresh satellite sample when the claim needs one),
//! detect tool use, classify provenance, collect data hints, and write the
//! validation sidecar.
//!
//! Items are evaluated one at a time. A failure, whether one transcript or a
//! whole model folder, is logged and counted, and the batch moves on.

use chrono::Utc;
use groundcheck_core::{
    begin_validation, classify_provenance, detect_tool_use, extract_data_hints, tool_outputs,
    CanonicalSnapshot, Framework, PromptManifest, Transcript, ValidationRecord, ValidationStep,
};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::providers::{CanonicalSource, FetchError};

/// Errors evaluating one transcript.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Prompt '{0}' is not in the manifest")]
    UnknownPrompt(String),

    #[error("Fresh satellite sample for prompt '{prompt}' failed: {source}")]
    FreshSample {
        prompt: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Failed to serialize canonical record: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Counts from one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub evaluated: usize,
    pub valid: usize,
    pub unverified: usize,
    pub failed: usize,
}

/// Current wall-clock time as fractional Unix seconds.
pub fn now_unix() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Validates transcripts of one run against one snapshot.
pub struct Evaluator<'a> {
    manifest: &'a PromptManifest,
    snapshot: &'a CanonicalSnapshot,
    source: &'a dyn CanonicalSource,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        manifest: &'a PromptManifest,
        snapshot: &'a CanonicalSnapshot,
        source: &'a dyn CanonicalSource,
    ) -> Self {
        if manifest.version != snapshot.version {
            tracing::warn!(
                manifest = %manifest.version,
                snapshot = %snapshot.version,
                "Manifest and snapshot versions differ"
            );
        }
        Self {
            manifest,
            snapshot,
            source,
        }
    }

    /// Evaluate one transcript.
    ///
    /// `now` is used as the evaluation instant when the transcript does not
    /// record one.
    pub async fn evaluate(
        &self,
        framework: Framework,
        model: &str,
        prompt_name: &str,
        transcript: &Transcript,
        now: f64,
    ) -> Result<ValidationRecord, EvalError> {
        let prompt = self
            .manifest
            .prompt(prompt_name)
            .ok_or_else(|| EvalError::UnknownPrompt(prompt_name.to_string()))?;

        let answer = transcript.answer(framework);
        let eval_time_unix = transcript.eval_time_unix.unwrap_or(now);
        let entry = self.snapshot.entry(prompt_name);

        let step = begin_validation(&prompt.target, &answer, entry.map(|e| &e.canonical));
        let validation = match step {
            ValidationStep::Complete(verdict) => verdict,
            pending @ ValidationStep::NeedsIssSample { .. } => {
                let fresh = self
                    .source
                    .iss_position()
                    .await
                    .map_err(|source| EvalError::FreshSample {
                        prompt: prompt_name.to_string(),
                        source,
                    })?;
                pending.finish(&answer, &fresh.sample, eval_time_unix)
            }
        };

        let tool_use = detect_tool_use(framework, &transcript.messages);
        let provenance = classify_provenance(tool_use.used, &validation);
        let data_hints = extract_data_hints(&tool_outputs(framework, &transcript.messages));

        let canonical = match entry {
            Some(e) => serde_json::to_value(&e.canonical)?,
            None => JsonValue::Object(Default::default()),
        };

        Ok(ValidationRecord {
            model: model.to_string(),
            framework,
            prompt_name: prompt_name.to_string(),
            prompt_version: transcript
                .prompt_version
                .clone()
                .unwrap_or_else(|| self.manifest.version.clone()),
            canonical,
            tool_used: tool_use.used,
            tool_names: tool_use.names,
            provenance,
            eval_time_unix,
            data_hints,
            validation,
        })
    }

    /// Evaluate every transcript of `run_id` for `models` and write sidecars.
    ///
    /// A model folder that cannot be listed counts as one failure.
    pub async fn evaluate_run(
        &self,
        store: &ArtifactStore,
        framework: Framework,
        models: &[String],
        run_id: &str,
    ) -> RunReport {
        let mut report = RunReport::default();

        for model in models {
            let transcripts = match store.list_transcripts(framework, model, Some(run_id)) {
                Ok(transcripts) => transcripts,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        %framework,
                        model = %model,
                        run_id,
                        error = %e,
                        "Failed to list transcripts"
                    );
                    continue;
                }
            };
            if transcripts.is_empty() {
                tracing::warn!(%framework, model = %model, run_id, "No transcripts found");
            }

            for t in transcripts {
                let outcome = self
                    .evaluate_file(store, framework, model, &t.prompt_name, &t.path, run_id)
                    .await;
                match outcome {
                    Ok(record) => {
                        report.evaluated += 1;
                        match record.validation.valid {
                            Some(true) => report.valid += 1,
                            None => report.unverified += 1,
                            Some(false) => {}
                        }
                        tracing::info!(
                            %framework,
                            model = %model,
                            prompt = %t.prompt_name,
                            valid = ?record.validation.valid,
                            reason = ?record.validation.reason,
                            provenance = %record.provenance,
                            "Evaluated"
                        );
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::error!(
                            %framework,
                            model = %model,
                            prompt = %t.prompt_name,
                            error = %e,
                            "Evaluation failed"
                        );
                    }
                }
            }
        }

        tracing::info!(
            %framework,
            run_id,
            evaluated = report.evaluated,
            valid = report.valid,
            unverified = report.unverified,
            failed = report.failed,
            "Run evaluated"
        );
        report
    }

    async fn evaluate_file(
        &self,
        store: &ArtifactStore,
        framework: Framework,
        model: &str,
        prompt_name: &str,
        path: &std::path::Path,
        run_id: &str,
    ) -> Result<ValidationRecord, EvalError> {
        let transcript = store.load_transcript(path)?;
        let record = self
            .evaluate(framework, model, prompt_name, &transcript, now_unix())
            .await?;
        store.write_validation(run_id, &record)?;
        Ok(record)
    }
}
