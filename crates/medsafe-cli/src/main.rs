//! MedSafe - diagnostic safety benchmark harness CLI
//!
//! The `medsafe` command samples a reproducible test set, runs every model
//! through inference, evaluation and transcript generation, and prints a
//! comparison of the resulting safety and effectiveness metrics.
//!
//! ## Commands
//!
//! - `run`: Execute the benchmark for one or more models
//! - `report`: Render results from existing artifacts without running anything
//! - `variants`: List the available prompt variants

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use medsafe_core::{FsTaskCache, RunConfig, Variant};
use medsafe_pipeline::{
    aggregate, render_results, render_run, write_report_json, BenchPipeline, CommandCollaborator,
    FailurePolicy, HarnessSettings, PipelineOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "medsafe")]
#[command(author = "MedSafe-Dx Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diagnostic safety benchmark harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark: sample, infer, evaluate and transcribe
    Run {
        #[command(flatten)]
        selection: Selection,

        /// Maximum number of models processed concurrently
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
        jobs: u16,

        /// Keep running remaining stages and models after a failure
        #[arg(long)]
        keep_going: bool,

        /// Provenance tag passed to the evaluator (default: variant name)
        #[arg(long)]
        model_version: Option<String>,

        /// Also write the run report as JSON to this path
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Render results from existing artifacts without invoking collaborators
    Report {
        #[command(flatten)]
        selection: Selection,
    },

    /// List available prompt variants
    Variants,
}

/// Which results a command refers to and where they live.
#[derive(Args, Debug, Clone)]
struct Selection {
    /// Number of test cases
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    case_count: u32,

    /// Model identifiers (e.g. openai/gpt-4o)
    #[arg(required = true)]
    models: Vec<String>,

    /// Prompt variant
    #[arg(long, default_value_t = Variant::Baseline)]
    variant: Variant,

    #[command(flatten)]
    paths: Paths,
}

#[derive(Args, Debug, Clone, Default)]
struct Paths {
    /// Settings file (TOML)
    #[arg(long, env = "MEDSAFE_CONFIG")]
    config: Option<PathBuf>,

    /// Test-set directory root (default: data)
    #[arg(long, env = "MEDSAFE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Results directory root (default: results)
    #[arg(long, env = "MEDSAFE_RESULTS_DIR")]
    results_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    medsafe_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            selection,
            jobs,
            keep_going,
            model_version,
            report_json,
        } => {
            cmd_run(
                &selection,
                usize::from(jobs),
                keep_going,
                model_version,
                report_json.as_deref(),
            )
            .await
        }
        Commands::Report { selection } => cmd_report(&selection).await,
        Commands::Variants => cmd_variants(),
    }
}

/// Settings from defaults, then the settings file, then flags and environment.
fn resolve_settings(paths: &Paths) -> Result<HarnessSettings> {
    let mut settings = match &paths.config {
        Some(path) => HarnessSettings::load(path)?,
        None => HarnessSettings::default(),
    };

    if let Some(dir) = &paths.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(dir) = &paths.results_dir {
        settings.results_dir = dir.clone();
    }
    Ok(settings)
}

fn run_config(selection: &Selection) -> Result<RunConfig> {
    RunConfig::new(selection.case_count, selection.variant, &selection.models)
        .context("invalid run configuration")
}

async fn cmd_run(
    selection: &Selection,
    jobs: usize,
    keep_going: bool,
    model_version: Option<String>,
    report_json: Option<&std::path::Path>,
) -> Result<()> {
    let config = run_config(selection)?;
    let settings = resolve_settings(&selection.paths)?;

    let options = PipelineOptions {
        policy: if keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::FailFast
        },
        jobs,
        model_version: model_version.or_else(|| settings.model_version.clone()),
    };

    info!(
        data_dir = %settings.data_dir.display(),
        results_dir = %settings.results_dir.display(),
        "using artifact directories"
    );

    let cache = Arc::new(FsTaskCache::new(settings.layout()));
    let collaborator = Arc::new(CommandCollaborator::new(settings.collaborators.clone()));
    let report = BenchPipeline::new(cache, collaborator, options)
        .run(&config)
        .await
        .context("benchmark run failed")?;

    println!("{}", render_run(&report));
    print!("{}", render_results(&config, &report.results));

    if let Some(path) = report_json {
        write_report_json(path, &report)?;
        info!(path = %path.display(), "wrote run report");
    }

    if report.success() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} stage failure(s); artifacts already written will be reused on the next run",
            report.failures().len()
        )
    }
}

async fn cmd_report(selection: &Selection) -> Result<()> {
    let config = run_config(selection)?;
    let settings = resolve_settings(&selection.paths)?;

    let cache = FsTaskCache::new(settings.layout());
    let results = aggregate(&cache, &config)
        .await
        .context("failed to read results")?;

    print!("{}", render_results(&config, &results));
    Ok(())
}

fn cmd_variants() -> Result<()> {
    for variant in Variant::ALL {
        let marker = if variant == Variant::default() {
            " (default)"
        } else {
            ""
        };
        println!("{:<12} {}{}", variant.name(), variant.description(), marker);
    }
    Ok(())
}
