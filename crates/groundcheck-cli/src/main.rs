//! groundcheck CLI - snapshot ground truth, validate runs, compare frameworks

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use groundcheck_core::{Framework, PromptManifest};
use groundcheck_runtime::{
    build_snapshot, compare_runs, load_snapshot, save_snapshot, write_comparison, ArtifactStore,
    Evaluator, FetchConfig, HttpCanonicalSource, SnapshotPolicy,
};

#[derive(Parser)]
#[command(name = "groundcheck")]
#[command(about = "Validate LLM answers against canonical ground truth", long_about = None)]
#[command(version)]
struct Cli {
    /// Fetch config file (YAML or JSON); keys fall back to the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-request timeout for canonical fetches, e.g. `20s` (overrides config)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Root of the transcript and sidecar tree
    #[arg(long, global = true, default_value = "results")]
    results_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch canonical data for every prompt and write the snapshot
    Snapshot {
        /// Prompt manifest (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        #[arg(long, default_value = "snapshots")]
        out_dir: PathBuf,

        /// Also print the snapshot to stdout
        #[arg(long)]
        print: bool,

        /// Leave out prompts whose fetch fails instead of aborting
        #[arg(long)]
        skip_failed: bool,
    },
    /// Validate every transcript of a run and write sidecars
    Evaluate {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Snapshot written by `groundcheck snapshot`
        #[arg(short, long)]
        snapshot: PathBuf,

        /// scratch or strands
        #[arg(short, long)]
        framework: Framework,

        #[arg(long, num_args = 1.., required = true)]
        models: Vec<String>,

        /// Run to evaluate; defaults to the run with the most transcripts
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Compare the two frameworks and write the summary
    Compare {
        #[arg(short, long)]
        manifest: PathBuf,

        #[arg(long, num_args = 1.., required = true)]
        models: Vec<String>,

        #[arg(long)]
        scratch_run_id: Option<String>,

        #[arg(long)]
        strands_run_id: Option<String>,
    },
}

fn fetch_config(path: Option<&PathBuf>, timeout: Option<Duration>) -> Result<FetchConfig> {
    let config = match path {
        Some(path) => FetchConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => FetchConfig::from_env()?,
    };
    Ok(match timeout {
        Some(timeout) => config.with_timeout(timeout),
        None => config,
    })
}

fn load_manifest(path: &PathBuf) -> Result<PromptManifest> {
    PromptManifest::from_file(path)
        .with_context(|| format!("Failed to load manifest from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = ArtifactStore::new(&cli.results_dir);

    match cli.command {
        Commands::Snapshot {
            manifest,
            out_dir,
            print,
            skip_failed,
        } => {
            let manifest = load_manifest(&manifest)?;
            let config = fetch_config(cli.config.as_ref(), cli.timeout)?;
            let source = HttpCanonicalSource::new(config)?;
            let policy = if skip_failed {
                SnapshotPolicy::SkipFailed
            } else {
                SnapshotPolicy::FailFast
            };

            let snapshot = build_snapshot(&manifest, &source, policy).await?;
            let path = save_snapshot(&snapshot, &out_dir)?;
            if print {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            eprintln!("Snapshot written to {}", path.display());
        }
        Commands::Evaluate {
            manifest,
            snapshot,
            framework,
            models,
            run_id,
        } => {
            let manifest = load_manifest(&manifest)?;
            let snapshot = load_snapshot(&snapshot)
                .with_context(|| format!("Failed to load snapshot from {}", snapshot.display()))?;
            let config = fetch_config(cli.config.as_ref(), cli.timeout)?;
            let source = HttpCanonicalSource::new(config)?;

            let run_id = match run_id {
                Some(id) => id,
                None => {
                    let prompt_names: Vec<String> =
                        manifest.prompts.iter().map(|p| p.name.clone()).collect();
                    let selection = store
                        .best_transcript_run(framework, &models, &prompt_names)?
                        .ok_or_else(|| {
                            anyhow!(
                                "No {} transcripts found under {}",
                                framework,
                                store.root().display()
                            )
                        })?;
                    tracing::info!(
                        run_id = %selection.run_id,
                        coverage = selection.coverage,
                        "Selected run"
                    );
                    selection.run_id
                }
            };

            let evaluator = Evaluator::new(&manifest, &snapshot, &source);
            let report = evaluator.evaluate_run(&store, framework, &models, &run_id).await;
            println!(
                "{} run {}: {} evaluated, {} valid, {} unverified, {} failed",
                framework, run_id, report.evaluated, report.valid, report.unverified, report.failed
            );
        }
        Commands::Compare {
            manifest,
            models,
            scratch_run_id,
            strands_run_id,
        } => {
            let manifest = load_manifest(&manifest)?;

            let mut overrides = BTreeMap::new();
            if let Some(id) = scratch_run_id {
                overrides.insert(Framework::Scratch, id);
            }
            if let Some(id) = strands_run_id {
                overrides.insert(Framework::Strands, id);
            }

            let summary = compare_runs(&store, &manifest, &models, &overrides)?;
            let paths = write_comparison(&store, &summary)?;
            println!("{}", paths.markdown.display());
            println!("{}", paths.json.display());
            println!("{}", paths.llm_prompt.display());
        }
    }

    Ok(())
}
