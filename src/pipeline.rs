//! End-to-end evaluation pipeline.
//!
//! The stages run strictly in sequence:
//!
//! 1. load the raw table and report its class distribution;
//! 2. normalize every message into the cleaned table;
//! 3. split, fit the vocabulary on the training texts, vectorize;
//! 4. train and score every registered model on the shared [`Dataset`];
//! 5. rank the successful models by accuracy.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::TextNormalizer;
use crate::config::PipelineConfig;
use crate::dataset::record::Label;
use crate::dataset::{self, CleanedRecord, Dataset, DatasetStats, RawRecord, loader};
use crate::error::Result;
use crate::feature::TfIdfVectorizer;
use crate::ml::{Evaluator, Leaderboard, ModelFailure, ModelRegistry};

/// Shape of the dataset a run was evaluated on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Training rows.
    pub n_train: usize,
    /// Test rows.
    pub n_test: usize,
    /// Vocabulary size.
    pub n_features: usize,
    /// Spam rows in the training partition.
    pub train_spam: usize,
    /// Spam rows in the test partition.
    pub test_spam: usize,
}

impl DatasetSummary {
    fn of(dataset: &Dataset) -> Self {
        let spam = |y: &[Label]| y.iter().filter(|l| **l == Label::Spam).count();
        Self {
            n_train: dataset.y_train.len(),
            n_test: dataset.y_test.len(),
            n_features: dataset.n_features(),
            train_spam: spam(&dataset.y_train),
            test_spam: spam(&dataset.y_test),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    /// Class distribution of the raw table, when the run started from it.
    pub raw_stats: Option<DatasetStats>,
    /// Dataset shape.
    pub summary: DatasetSummary,
    /// Successful models, best first.
    pub leaderboard: Leaderboard,
    /// Models excluded because they failed.
    pub failures: Vec<ModelFailure>,
}

/// Configured pipeline.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: TextNormalizer,
}

impl Pipeline {
    /// Create a pipeline with the default English normalizer.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_normalizer(config, TextNormalizer::new())
    }

    /// Create a pipeline with a custom normalizer.
    pub fn with_normalizer(config: PipelineConfig, normalizer: TextNormalizer) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, normalizer })
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the raw table.
    pub fn load(&self, raw_path: &Path) -> Result<Vec<RawRecord>> {
        loader::load_raw(raw_path, &self.config.dataset)
    }

    /// Class distribution and duplicates of the raw table.
    pub fn explore(&self, raw_path: &Path) -> Result<DatasetStats> {
        let records = self.load(raw_path)?;
        let stats = DatasetStats::compute(&records);
        log_stats(&stats);
        Ok(stats)
    }

    /// Normalize raw records.
    pub fn clean(&self, records: &[RawRecord]) -> Vec<CleanedRecord> {
        dataset::clean_records(records, &self.normalizer)
    }

    /// Load, normalize and write the cleaned table.
    pub fn preprocess(&self, raw_path: &Path, cleaned_path: &Path) -> Result<Vec<CleanedRecord>> {
        let records = self.load(raw_path)?;
        let cleaned = self.clean(&records);
        loader::write_cleaned(cleaned_path, &cleaned)?;
        Ok(cleaned)
    }

    /// Split and vectorize cleaned records.
    pub fn build_dataset(&self, cleaned: &[CleanedRecord]) -> Result<Dataset> {
        let vectorizer = TfIdfVectorizer::new(self.config.vectorizer.max_features)?;
        Dataset::build(cleaned, &self.config.split, &vectorizer)
    }

    /// Evaluate the standard models on cleaned records.
    pub fn evaluate(&self, cleaned: &[CleanedRecord]) -> Result<RunOutcome> {
        let registry = ModelRegistry::standard(&self.config.models);
        self.evaluate_with(cleaned, &registry)
    }

    /// Evaluate a custom registry on cleaned records.
    pub fn evaluate_with(
        &self,
        cleaned: &[CleanedRecord],
        registry: &ModelRegistry,
    ) -> Result<RunOutcome> {
        let dataset = self.build_dataset(cleaned)?;
        let summary = DatasetSummary::of(&dataset);

        let report = Evaluator::new().evaluate(registry, &dataset);
        if report.results.is_empty() {
            warn!("Every model failed; the leaderboard is empty");
        }

        let leaderboard = Leaderboard::rank(report.results);
        if let Some(best) = leaderboard.best() {
            info!("Best model: {} ({:.4})", best.model_name, best.accuracy);
        }

        Ok(RunOutcome {
            raw_stats: None,
            summary,
            leaderboard,
            failures: report.failures,
        })
    }

    /// Evaluate the standard models on a cleaned table written by
    /// [`Pipeline::preprocess`].
    pub fn train(&self, cleaned_path: &Path) -> Result<RunOutcome> {
        let cleaned = loader::read_cleaned(cleaned_path)?;
        self.evaluate(&cleaned)
    }

    /// Load, explore, normalize and evaluate in one go.
    pub fn run(&self, raw_path: &Path) -> Result<RunOutcome> {
        let records = self.load(raw_path)?;
        let stats = DatasetStats::compute(&records);
        log_stats(&stats);
        let cleaned = self.clean(&records);
        let mut outcome = self.evaluate(&cleaned)?;
        outcome.raw_stats = Some(stats);
        Ok(outcome)
    }
}

fn log_stats(stats: &DatasetStats) {
    info!(
        "{} rows: {} ham ({:.2}%), {} spam ({:.2}%), {} duplicates, {} without text",
        stats.rows,
        stats.ham,
        stats.percentage(Label::Ham),
        stats.spam,
        stats.percentage(Label::Spam),
        stats.duplicates,
        stats.missing_text
    );
}
