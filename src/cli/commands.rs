//! Command implementations for the spamsieve CLI.

use std::path::Path;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::Result;
use crate::pipeline::{Pipeline, RunOutcome};

/// Execute a CLI command.
pub fn execute_command(args: SpamSieveArgs) -> Result<()> {
    match &args.command {
        Command::Explore(explore_args) => explore(explore_args, &args),
        Command::Preprocess(preprocess_args) => preprocess(preprocess_args, &args),
        Command::Train(train_args) => train(train_args, &args),
        Command::Run(run_args) => run(run_args, &args),
    }
}

fn pipeline(pipeline_args: &PipelineArgs) -> Result<Pipeline> {
    Pipeline::new(pipeline_args.to_config()?)
}

/// Show the class distribution of a raw dataset.
fn explore(args: &ExploreArgs, cli_args: &SpamSieveArgs) -> Result<()> {
    info!("Exploring {}", args.raw.display());
    let stats = pipeline(&args.pipeline)?.explore(&args.raw)?;

    if let Some(dir) = &args.pipeline.figures_dir {
        export_class_distribution(dir, &stats)?;
    }

    output_result(
        "Dataset exploration",
        &ExploreResult {
            path: args.raw.to_string_lossy().to_string(),
            stats,
        },
        cli_args,
    )
}

/// Normalize a raw dataset and write the cleaned table.
fn preprocess(args: &PreprocessArgs, cli_args: &SpamSieveArgs) -> Result<()> {
    info!(
        "Preprocessing {} into {}",
        args.raw.display(),
        args.cleaned.display()
    );
    let cleaned = pipeline(&args.pipeline)?.preprocess(&args.raw, &args.cleaned)?;

    output_result(
        "Preprocessing complete",
        &PreprocessResult {
            raw: args.raw.to_string_lossy().to_string(),
            cleaned: args.cleaned.to_string_lossy().to_string(),
            rows: cleaned.len(),
            empty_after_cleaning: cleaned.iter().filter(|r| r.cleaned_text.is_empty()).count(),
        },
        cli_args,
    )
}

/// Evaluate every model on a cleaned table.
fn train(args: &TrainArgs, cli_args: &SpamSieveArgs) -> Result<()> {
    info!("Training on {}", args.cleaned.display());
    let outcome = pipeline(&args.pipeline)?.train(&args.cleaned)?;
    report(&outcome, args.pipeline.figures_dir.as_deref(), cli_args)
}

/// Preprocess in memory and evaluate every model.
fn run(args: &RunArgs, cli_args: &SpamSieveArgs) -> Result<()> {
    info!("Running the full pipeline on {}", args.raw.display());
    let outcome = pipeline(&args.pipeline)?.run(&args.raw)?;
    report(&outcome, args.pipeline.figures_dir.as_deref(), cli_args)
}

fn report(outcome: &RunOutcome, figures_dir: Option<&Path>, cli_args: &SpamSieveArgs) -> Result<()> {
    if let Some(dir) = figures_dir {
        if let Some(stats) = &outcome.raw_stats {
            export_class_distribution(dir, stats)?;
        }
        let written = export_model_figures(dir, outcome)?;
        info!("Wrote {} figure files to {}", written.len(), dir.display());
    }

    output_result("Model evaluation", &RunReport::new(outcome), cli_args)
}
