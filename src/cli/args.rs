//! Command line argument parsing for the spamsieve CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ml::isolation_forest::Contamination;

/// spamsieve - side-by-side evaluation of spam classifiers
#[derive(Parser, Debug, Clone)]
#[command(name = "spamsieve")]
#[command(about = "Train and compare spam/ham classifiers on a labeled message table")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SpamSieveArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SpamSieveArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show class distribution and duplicates of a raw dataset
    Explore(ExploreArgs),

    /// Normalize a raw dataset and write the cleaned table
    Preprocess(PreprocessArgs),

    /// Evaluate every model on a cleaned table
    Train(TrainArgs),

    /// Preprocess in memory, then evaluate every model
    Run(RunArgs),
}

/// Arguments for exploring a raw dataset
#[derive(Args, Debug, Clone)]
pub struct ExploreArgs {
    /// Raw dataset (CSV or JSON Lines)
    #[arg(value_name = "RAW")]
    pub raw: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for preprocessing
#[derive(Args, Debug, Clone)]
pub struct PreprocessArgs {
    /// Raw dataset (CSV or JSON Lines)
    #[arg(value_name = "RAW")]
    pub raw: PathBuf,

    /// Where to write the cleaned table
    #[arg(value_name = "CLEANED")]
    pub cleaned: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for evaluating a cleaned table
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Cleaned table written by `preprocess`
    #[arg(value_name = "CLEANED")]
    pub cleaned: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for the full pipeline
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Raw dataset (CSV or JSON Lines)
    #[arg(value_name = "RAW")]
    pub raw: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Configuration file and overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Directory for confusion matrix / ROC curve / class distribution data
    #[arg(long, value_name = "DIR")]
    pub figures_dir: Option<PathBuf>,

    /// Maximum vocabulary size
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Seed for the split and every seeded model
    #[arg(long)]
    pub seed: Option<u64>,

    /// Isolation forest contamination: a fraction or "prevalence"
    #[arg(long)]
    pub contamination: Option<Contamination>,

    /// Worker threads for ensemble fitting
    #[arg(long)]
    pub n_jobs: Option<usize>,
}

impl PipelineArgs {
    /// Load the configuration file (or defaults) and apply the overrides.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(max_features) = self.max_features {
            config.vectorizer.max_features = max_features;
        }
        if let Some(test_size) = self.test_size {
            config.split.test_size = test_size;
        }
        if let Some(seed) = self.seed {
            config.split.seed = seed;
            let models = &mut config.models;
            models.decision_tree.seed = seed;
            models.random_forest.seed = seed;
            models.svm.seed = seed;
            models.isolation_forest.seed = seed;
        }
        if let Some(contamination) = self.contamination {
            config.models.isolation_forest.contamination = contamination;
        }
        if self.n_jobs.is_some() {
            config.models.n_jobs = self.n_jobs;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable report
    Human,
    /// JSON document
    Json,
}
