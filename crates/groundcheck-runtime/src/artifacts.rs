//! On-disk artifact layout.
//!
//! ```text
//! <root>/<framework>/<model_folder>/<prompt>_<run_id>.json             transcript
//! <root>/<framework>/<model_folder>/<prompt>_<run_id>_validation.json  sidecar
//! ```
//!
//! Run ids are UTC `YYYYMMDD_HHMMSS` stamps, so they sort chronologically.
//! Older scratch runners wrote `<prompt>.json` and `<prompt>_validation.json`
//! with no stamp; those files belong to the run [`LEGACY_RUN_ID`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use groundcheck_core::{
    sanitize_path_component, select_run, Framework, RunSelection, Transcript, TranscriptFile,
    ValidationRecord, LEGACY_RUN_ID,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

lazy_static! {
    /// `<prompt>_<run_id>.json`
    static ref TRANSCRIPT_FILE: Regex = Regex::new(r"^(.+)_(\d{8}_\d{6})\.json$").unwrap();

    /// `<prompt>_<run_id>_validation.json`
    static ref VALIDATION_FILE: Regex =
        Regex::new(r"^(.+)_(\d{8}_\d{6})_validation\.json$").unwrap();

    /// `<prompt>.json`, legacy run
    static ref LEGACY_TRANSCRIPT_FILE: Regex = Regex::new(r"^(.+)\.json$").unwrap();

    /// `<prompt>_validation.json`, legacy run
    static ref LEGACY_VALIDATION_FILE: Regex = Regex::new(r"^(.+)_validation\.json$").unwrap();
}

/// (prompt, run id) of a transcript file name. Sidecars are not transcripts.
fn parse_transcript_name(file_name: &str) -> Option<(String, String)> {
    if LEGACY_VALIDATION_FILE.is_match(file_name) {
        return None;
    }
    if let Some(caps) = TRANSCRIPT_FILE.captures(file_name) {
        return Some((caps[1].to_string(), caps[2].to_string()));
    }
    LEGACY_TRANSCRIPT_FILE
        .captures(file_name)
        .map(|caps| (caps[1].to_string(), LEGACY_RUN_ID.to_string()))
}

/// (prompt, run id) of a sidecar file name.
fn parse_validation_name(file_name: &str) -> Option<(String, String)> {
    if let Some(caps) = VALIDATION_FILE.captures(file_name) {
        return Some((caps[1].to_string(), caps[2].to_string()));
    }
    LEGACY_VALIDATION_FILE
        .captures(file_name)
        .map(|caps| (caps[1].to_string(), LEGACY_RUN_ID.to_string()))
}

/// File stem shared by a transcript and its sidecar.
fn artifact_stem(prompt: &str, run_id: &str) -> String {
    if run_id == LEGACY_RUN_ID {
        prompt.to_string()
    } else {
        format!("{}_{}", prompt, run_id)
    }
}

/// Errors reading or writing artifacts.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Folder name for a model: spaces become `_`, anything outside `[-\w.]` is
/// dropped, and names that would resolve to `.` or `..` get a `_` prefix.
pub fn sanitize_model_folder(model: &str) -> String {
    sanitize_path_component(model)
}

/// A fresh run id for the current instant.
pub fn new_run_id() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// A transcript found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRef {
    pub prompt_name: String,
    pub run_id: String,
    pub path: PathBuf,
}

/// Artifact tree rooted at one results directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_dir(&self, framework: Framework, model: &str) -> PathBuf {
        self.root
            .join(framework.as_str())
            .join(sanitize_model_folder(model))
    }

    pub fn transcript_path(
        &self,
        framework: Framework,
        model: &str,
        prompt: &str,
        run_id: &str,
    ) -> PathBuf {
        self.model_dir(framework, model)
            .join(format!("{}.json", artifact_stem(prompt, run_id)))
    }

    pub fn validation_path(
        &self,
        framework: Framework,
        model: &str,
        prompt: &str,
        run_id: &str,
    ) -> PathBuf {
        self.model_dir(framework, model)
            .join(format!("{}_validation.json", artifact_stem(prompt, run_id)))
    }

    pub fn write_transcript(
        &self,
        framework: Framework,
        model: &str,
        prompt: &str,
        run_id: &str,
        transcript: &Transcript,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.transcript_path(framework, model, prompt, run_id);
        write_json(&path, transcript)?;
        Ok(path)
    }

    /// Read a transcript in either the bare or the wrapped shape.
    pub fn load_transcript(&self, path: &Path) -> Result<Transcript, ArtifactError> {
        let file: TranscriptFile = read_json(path)?;
        Ok(file.into_transcript())
    }

    pub fn write_validation(
        &self,
        run_id: &str,
        record: &ValidationRecord,
    ) -> Result<PathBuf, ArtifactError> {
        let path =
            self.validation_path(record.framework, &record.model, &record.prompt_name, run_id);
        write_json(&path, record)?;
        Ok(path)
    }

    /// The sidecar for one evaluation, if it exists.
    pub fn load_validation(
        &self,
        framework: Framework,
        model: &str,
        prompt: &str,
        run_id: &str,
    ) -> Result<Option<ValidationRecord>, ArtifactError> {
        let path = self.validation_path(framework, model, prompt, run_id);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Transcripts for a model, optionally restricted to one run.
    ///
    /// Sorted by prompt name, then run id. A missing model folder is empty,
    /// not an error.
    pub fn list_transcripts(
        &self,
        framework: Framework,
        model: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<TranscriptRef>, ArtifactError> {
        let dir = self.model_dir(framework, model);
        let mut found = Vec::new();

        for file_name in list_file_names(&dir)? {
            let Some((prompt_name, found_run)) = parse_transcript_name(&file_name) else {
                continue;
            };
            if run_id.is_some_and(|r| r != found_run) {
                continue;
            }
            found.push(TranscriptRef {
                prompt_name,
                run_id: found_run,
                path: dir.join(&file_name),
            });
        }

        found.sort_by(|a, b| (&a.prompt_name, &a.run_id).cmp(&(&b.prompt_name, &b.run_id)));
        Ok(found)
    }

    /// For each run id, the (model, prompt) pairs with a transcript.
    pub fn transcript_coverage(
        &self,
        framework: Framework,
        models: &[String],
        prompt_names: &[String],
    ) -> Result<BTreeMap<String, BTreeSet<(String, String)>>, ArtifactError> {
        let mut covered: BTreeMap<String, BTreeSet<(String, String)>> = BTreeMap::new();
        for model in models {
            for t in self.list_transcripts(framework, model, None)? {
                if prompt_names.contains(&t.prompt_name) {
                    covered
                        .entry(t.run_id)
                        .or_default()
                        .insert((model.clone(), t.prompt_name));
                }
            }
        }
        Ok(covered)
    }

    /// For each run id, the (model, prompt) pairs with a readable sidecar.
    ///
    /// The model and prompt are taken from the sidecar payload, so folders
    /// shared by models whose names sanitize alike are told apart. Unreadable
    /// sidecars are skipped with a warning.
    pub fn validation_coverage(
        &self,
        framework: Framework,
        models: &[String],
        prompt_names: &[String],
    ) -> Result<BTreeMap<String, BTreeSet<(String, String)>>, ArtifactError> {
        let mut covered: BTreeMap<String, BTreeSet<(String, String)>> = BTreeMap::new();
        let folders: BTreeSet<String> = models.iter().map(|m| sanitize_model_folder(m)).collect();

        for folder in folders {
            let dir = self.root.join(framework.as_str()).join(folder);
            for file_name in list_file_names(&dir)? {
                let Some((_, run_id)) = parse_validation_name(&file_name) else {
                    continue;
                };
                let path = dir.join(&file_name);
                let record: ValidationRecord = match read_json(&path) {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unreadable validation sidecar");
                        continue;
                    }
                };
                if models.contains(&record.model) && prompt_names.contains(&record.prompt_name) {
                    covered
                        .entry(run_id)
                        .or_default()
                        .insert((record.model, record.prompt_name));
                }
            }
        }
        Ok(covered)
    }

    /// The run with the most transcripts for `models` × `prompt_names`.
    pub fn best_transcript_run(
        &self,
        framework: Framework,
        models: &[String],
        prompt_names: &[String],
    ) -> Result<Option<RunSelection>, ArtifactError> {
        let covered = self.transcript_coverage(framework, models, prompt_names)?;
        Ok(select_run(&covered, models.len() * prompt_names.len()))
    }

    /// The run with the most sidecars for `models` × `prompt_names`.
    pub fn best_validation_run(
        &self,
        framework: Framework,
        models: &[String],
        prompt_names: &[String],
    ) -> Result<Option<RunSelection>, ArtifactError> {
        let covered = self.validation_coverage(framework, models, prompt_names)?;
        Ok(select_run(&covered, models.len() * prompt_names.len()))
    }
}

/// File names in `dir`, sorted. A missing folder is empty; anything else that
/// is not a readable folder is an error.
fn list_file_names(dir: &Path) -> Result<Vec<String>, ArtifactError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| ArtifactError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let contents = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}
