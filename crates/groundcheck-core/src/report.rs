//! Cross-framework comparison summary.
//!
//! Groups validation sidecars by framework and model, counts verified and
//! valid answers, and compares the two frameworks prompt by prompt. Three
//! outcomes are kept apart throughout: no artifact at all (`missing`), an
//! unverifiable answer (`valid` is null) and a verified wrong answer.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::round_to;
use crate::provenance::ProvenanceLabel;
use crate::record::ValidationRecord;
use crate::transcript::{transcript_metrics, Framework, Transcript, TranscriptMetrics};
use crate::verdict::Reason;

/// One evaluated answer, reduced to what the summary needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub framework: Framework,
    pub model: String,
    pub prompt_name: String,
    pub valid: Option<bool>,
    pub reason: Option<Reason>,
    pub provenance: ProvenanceLabel,
    pub metrics: TranscriptMetrics,
    pub final_text_source: String,
}

impl RunOutcome {
    /// Pair a sidecar with the transcript it was computed from.
    pub fn from_record(record: &ValidationRecord, transcript: &Transcript) -> Self {
        Self {
            framework: record.framework,
            model: record.model.clone(),
            prompt_name: record.prompt_name.clone(),
            valid: record.validation.valid,
            reason: record.validation.reason.clone(),
            provenance: record.provenance,
            metrics: transcript_metrics(record.framework, &transcript.messages),
            final_text_source: transcript.final_text_source(record.framework),
        }
    }
}

/// How the run id used for the summary was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSelection {
    pub run_id: String,
    /// Models × prompts requested.
    pub target_pairs: usize,
    /// Pairs covered by the chosen run.
    pub best_pairs: usize,
    pub coverage: f64,
    pub available_run_ids: Vec<String>,
}

/// Run id of artifacts written without a run stamp (`<prompt>.json`), as
/// older scratch runners did.
pub const LEGACY_RUN_ID: &str = "legacy";

/// Recency order: the legacy run is older than any stamped run, and
/// `YYYYMMDD_HHMMSS` stamps sort chronologically.
fn recency(run_id: &str) -> (bool, &str) {
    (run_id != LEGACY_RUN_ID, run_id)
}

/// Pick the run id covering the most (model, prompt) pairs.
///
/// Ties go to the most recent run.
pub fn select_run(
    covered: &BTreeMap<String, BTreeSet<(String, String)>>,
    target_pairs: usize,
) -> Option<RunSelection> {
    let (run_id, _) = covered.iter().max_by(|a, b| {
        a.1.len()
            .cmp(&b.1.len())
            .then_with(|| recency(a.0).cmp(&recency(b.0)))
    })?;
    Some(pinned_run(covered, run_id, target_pairs))
}

/// Selection record for an explicitly requested run id.
///
/// The id need not appear in `covered`; its coverage is then zero.
pub fn pinned_run(
    covered: &BTreeMap<String, BTreeSet<(String, String)>>,
    run_id: &str,
    target_pairs: usize,
) -> RunSelection {
    let best_pairs = covered.get(run_id).map_or(0, |pairs| pairs.len());
    let coverage = if target_pairs > 0 {
        round_to(best_pairs as f64 / target_pairs as f64, 3)
    } else {
        0.0
    };

    RunSelection {
        run_id: run_id.to_string(),
        target_pairs,
        best_pairs,
        coverage,
        available_run_ids: covered.keys().cloned().collect(),
    }
}

/// Aggregates for one framework and model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub runs: usize,
    /// Runs whose `valid` is not null.
    pub verified_runs: usize,
    pub valid_runs: usize,
    /// `valid_runs / verified_runs`; null when nothing was verified.
    pub valid_rate_verified: Option<f64>,
    pub avg_assistant_turns: f64,
    pub avg_tool_calls: f64,
    pub provenance: BTreeMap<ProvenanceLabel, usize>,
    /// Reason counts over verified-wrong runs.
    pub fail_reasons: BTreeMap<Reason, usize>,
    /// Where each run's answer text came from.
    #[serde(default)]
    pub final_text_sources: BTreeMap<String, usize>,
}

impl ModelStats {
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a RunOutcome>) -> Self {
        let mut stats = ModelStats::default();
        let mut turns = 0usize;
        let mut tool_calls = 0usize;

        for run in runs {
            stats.runs += 1;
            turns += run.metrics.assistant_turns;
            tool_calls += run.metrics.tool_calls;
            *stats.provenance.entry(run.provenance).or_default() += 1;
            *stats
                .final_text_sources
                .entry(run.final_text_source.clone())
                .or_default() += 1;

            match run.valid {
                Some(true) => {
                    stats.verified_runs += 1;
                    stats.valid_runs += 1;
                }
                Some(false) => {
                    stats.verified_runs += 1;
                    if let Some(reason) = &run.reason {
                        *stats.fail_reasons.entry(reason.clone()).or_default() += 1;
                    }
                }
                None => {}
            }
        }

        if stats.runs > 0 {
            stats.avg_assistant_turns = round_to(turns as f64 / stats.runs as f64, 2);
            stats.avg_tool_calls = round_to(tool_calls as f64 / stats.runs as f64, 2);
        }
        if stats.verified_runs > 0 {
            stats.valid_rate_verified = Some(round_to(
                stats.valid_runs as f64 / stats.verified_runs as f64,
                3,
            ));
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkStats {
    pub scratch: ModelStats,
    pub strands: ModelStats,
}

/// Both frameworks' outcome for the same model and prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseEntry {
    pub model: String,
    pub prompt_name: String,
    pub scratch_valid: Option<bool>,
    pub strands_valid: Option<bool>,
    pub scratch_reason: Option<Reason>,
    pub strands_reason: Option<Reason>,
    pub scratch_turns: usize,
    pub strands_turns: usize,
    pub scratch_tool_calls: usize,
    pub strands_tool_calls: usize,
    pub strands_final_text_source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    ScratchWins,
    StrandsWins,
    Tie,
}

impl PairwiseEntry {
    /// A side wins only if it is valid and the other is not.
    pub fn outcome(&self) -> PairOutcome {
        match (self.scratch_valid == Some(true), self.strands_valid == Some(true)) {
            (true, false) => PairOutcome::ScratchWins,
            (false, true) => PairOutcome::StrandsWins,
            _ => PairOutcome::Tie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEntry {
    pub framework: Framework,
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStats {
    pub scratch_verified: usize,
    pub scratch_valid_verified: usize,
    pub strands_verified: usize,
    pub strands_valid_verified: usize,
    pub scratch_wins: usize,
    pub strands_wins: usize,
    pub ties: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetadata {
    pub generated_at: DateTime<Utc>,
    pub models: Vec<String>,
    pub prompt_names: Vec<String>,
    pub manifest_version: String,
    /// Run chosen per framework. Frameworks with no runs are absent.
    #[serde(default)]
    pub runs: BTreeMap<Framework, RunSelection>,
}

/// The full comparison, serialized as the summary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub metadata: ComparisonMetadata,
    pub overall: OverallStats,
    pub by_model: BTreeMap<String, FrameworkStats>,
    pub pairwise: Vec<PairwiseEntry>,
    pub missing: Vec<MissingEntry>,
}

/// Build the comparison for `models` × `prompt_names` from loaded outcomes.
///
/// Any (framework, model, prompt) without an outcome is listed as missing.
pub fn build_comparison(
    models: &[String],
    prompt_names: &[String],
    manifest_version: &str,
    runs: BTreeMap<Framework, RunSelection>,
    outcomes: &[RunOutcome],
) -> ComparisonSummary {
    let index: BTreeMap<(Framework, &str, &str), &RunOutcome> = outcomes
        .iter()
        .map(|o| ((o.framework, o.model.as_str(), o.prompt_name.as_str()), o))
        .collect();

    let mut missing = Vec::new();
    let mut pairwise = Vec::new();
    let mut overall = OverallStats::default();

    for model in models {
        for prompt in prompt_names {
            let scratch = index.get(&(Framework::Scratch, model.as_str(), prompt.as_str()));
            let strands = index.get(&(Framework::Strands, model.as_str(), prompt.as_str()));

            let sides = [(Framework::Scratch, scratch), (Framework::Strands, strands)];
            for (framework, found) in sides {
                if found.is_none() {
                    missing.push(MissingEntry {
                        framework,
                        model: model.clone(),
                        prompt: prompt.clone(),
                    });
                }
            }

            if let (Some(s), Some(t)) = (scratch, strands) {
                let entry = PairwiseEntry {
                    model: model.clone(),
                    prompt_name: prompt.clone(),
                    scratch_valid: s.valid,
                    strands_valid: t.valid,
                    scratch_reason: s.reason.clone(),
                    strands_reason: t.reason.clone(),
                    scratch_turns: s.metrics.assistant_turns,
                    strands_turns: t.metrics.assistant_turns,
                    scratch_tool_calls: s.metrics.tool_calls,
                    strands_tool_calls: t.metrics.tool_calls,
                    strands_final_text_source: t.final_text_source.clone(),
                };
                match entry.outcome() {
                    PairOutcome::ScratchWins => overall.scratch_wins += 1,
                    PairOutcome::StrandsWins => overall.strands_wins += 1,
                    PairOutcome::Tie => overall.ties += 1,
                }
                pairwise.push(entry);
            }
        }
    }

    let mut by_model = BTreeMap::new();
    for model in models {
        let runs_for = |framework: Framework| {
            ModelStats::from_runs(
                outcomes
                    .iter()
                    .filter(move |o| o.framework == framework && &o.model == model)
                    .filter(|o| prompt_names.contains(&o.prompt_name)),
            )
        };
        by_model.insert(
            model.clone(),
            FrameworkStats {
                scratch: runs_for(Framework::Scratch),
                strands: runs_for(Framework::Strands),
            },
        );
    }

    for stats in by_model.values() {
        overall.scratch_verified += stats.scratch.verified_runs;
        overall.scratch_valid_verified += stats.scratch.valid_runs;
        overall.strands_verified += stats.strands.verified_runs;
        overall.strands_valid_verified += stats.strands.valid_runs;
    }

    ComparisonSummary {
        metadata: ComparisonMetadata {
            generated_at: Utc::now(),
            models: models.to_vec(),
            prompt_names: prompt_names.to_vec(),
            manifest_version: manifest_version.to_string(),
            runs,
        },
        overall,
        by_model,
        pairwise,
        missing,
    }
}

fn run_id(meta: &ComparisonMetadata, framework: Framework) -> &str {
    meta.runs.get(&framework).map(|r| r.run_id.as_str()).unwrap_or("none")
}

fn rate(valid: usize, verified: usize) -> String {
    format!("{}/{}", valid, verified)
}

/// Short markdown rendering of a summary.
pub fn render_markdown(summary: &ComparisonSummary) -> String {
    let meta = &summary.metadata;
    let overall = &summary.overall;
    let mut lines = vec![
        "# Framework Comparison".to_string(),
        String::new(),
        format!("- Generated: `{}`", meta.generated_at.format("%Y-%m-%dT%H:%M:%SZ")),
        format!("- Manifest version: `{}`", meta.manifest_version),
        format!(
            "- Run ids: scratch `{}`, strands `{}`",
            run_id(meta, Framework::Scratch),
            run_id(meta, Framework::Strands)
        ),
        format!("- Models: {}", meta.models.join(", ")),
        format!("- Prompts: {}", meta.prompt_names.join(", ")),
        String::new(),
        "## Headline".to_string(),
        format!(
            "- Scratch valid (verified): `{}`",
            rate(overall.scratch_valid_verified, overall.scratch_verified)
        ),
        format!(
            "- Strands valid (verified): `{}`",
            rate(overall.strands_valid_verified, overall.strands_verified)
        ),
        format!(
            "- Pairwise wins: scratch `{}`, strands `{}`, ties `{}`",
            overall.scratch_wins, overall.strands_wins, overall.ties
        ),
        String::new(),
        "## Models".to_string(),
    ];

    for (model, stats) in &summary.by_model {
        lines.push(format!(
            "- `{}`: scratch `{}`, strands `{}`; turns scratch `{}`, strands `{}`",
            model,
            rate(stats.scratch.valid_runs, stats.scratch.verified_runs),
            rate(stats.strands.valid_runs, stats.strands.verified_runs),
            stats.scratch.avg_assistant_turns,
            stats.strands.avg_assistant_turns,
        ));
    }

    if !summary.missing.is_empty() {
        lines.push(String::new());
        lines.push(format!("## Missing ({})", summary.missing.len()));
        for m in &summary.missing {
            lines.push(format!("- {} / `{}` / `{}`", m.framework, m.model, m.prompt));
        }
    }

    lines.push(String::new());
    lines.push("Verified counts exclude answers whose `valid` is null.".to_string());
    lines.join("\n") + "\n"
}

/// Instructions for an LLM to write the narrative report from a summary.
///
/// The prompt only points at the two files; the numbers stay in the JSON.
pub fn render_llm_prompt(summary_path: &str, markdown_path: &str) -> String {
    format!(
        r#"# Task: Generate Standardized Evaluation Report

You are given a deterministic JSON comparison summary at:
`{summary_path}`

There is also a concise markdown snapshot at:
`{markdown_path}`

## Objective
Write a model-first report that:
1. Ranks models by verified correctness and robustness.
2. Explains framework effects (scratch vs strands) as secondary analysis.
3. Separates parametric vs tool-assisted behavior.
4. Highlights surprising patterns and likely root causes.
5. Distinguishes objective findings from interpretation.

## Required Structure
- Executive Summary
- Model-by-Model Findings
- Framework Effects (Secondary)
- Failure Modes and Root Causes
- Recommendations for Next Experiment

## Guardrails
- Use exact numbers from JSON.
- Do not invent data not present in artifacts.
- Explicitly call out unverified prompts (`validation.valid = null`) separately.
"#
    )
}
