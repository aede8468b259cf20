//! Configuration for an evaluation run.
//!
//! Every section has a `Default` matching the reference setup (3000 TF-IDF
//! features, 80/20 split with seed 42, the five standard models) and can be
//! overridden from a JSON file; missing keys keep their defaults.
//!
//! ```json
//! {
//!   "vectorizer": { "max_features": 5000 },
//!   "split": { "test_size": 0.25 },
//!   "models": { "isolation_forest": { "contamination": "train_prevalence" } }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::split::TrainTestSplit;
use crate::error::{Result, SpamSieveError};
use crate::feature::tfidf::DEFAULT_MAX_FEATURES;
use crate::ml::decision_tree::DecisionTreeConfig;
use crate::ml::isolation_forest::{Contamination, IsolationForestConfig};
use crate::ml::naive_bayes::NaiveBayesConfig;
use crate::ml::random_forest::RandomForestConfig;
use crate::ml::svm::SvmConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input table layout.
    pub dataset: DatasetConfig,
    /// Vectorizer settings.
    pub vectorizer: VectorizerConfig,
    /// Train/test split.
    pub split: TrainTestSplit,
    /// Per-model hyper-parameters.
    pub models: ModelsConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SpamSieveError::missing_input(format!(
                "configuration file {} not found",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.vectorizer.max_features == 0 {
            return Err(SpamSieveError::invalid_config(
                "vectorizer.max_features must be at least 1",
            ));
        }
        self.split
            .validate()
            .map_err(|e| SpamSieveError::invalid_config(e.to_string()))?;
        self.models.validate()
    }
}

/// Column names of the raw input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Column holding the message text.
    pub text_column: String,
    /// Column holding the 0/1 (or ham/spam) label.
    pub label_column: String,
    /// Columns tried, in order, when `label_column` is absent.
    pub fallback_label_columns: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            text_column: "text".to_string(),
            label_column: "label".to_string(),
            fallback_label_columns: vec!["label_num".to_string()],
        }
    }
}

impl DatasetConfig {
    /// The label column followed by its fallbacks.
    pub fn label_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.label_column.as_str())
            .chain(self.fallback_label_columns.iter().map(String::as_str))
    }
}

/// TF-IDF vectorizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Maximum vocabulary size.
    pub max_features: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

/// Hyper-parameters of the standard model set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Multinomial naive Bayes.
    pub naive_bayes: NaiveBayesConfig,
    /// Single CART tree.
    pub decision_tree: DecisionTreeConfig,
    /// Bagged CART trees.
    pub random_forest: RandomForestConfig,
    /// Linear SVM.
    pub svm: SvmConfig,
    /// Isolation forest.
    pub isolation_forest: IsolationForestConfig,
    /// Worker threads for ensemble fitting; `None` uses every core.
    pub n_jobs: Option<usize>,
}

impl ModelsConfig {
    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !(self.naive_bayes.alpha >= 0.0) {
            return Err(SpamSieveError::invalid_config(
                "naive_bayes.alpha must be non-negative",
            ));
        }
        if self.random_forest.n_estimators == 0 || self.isolation_forest.n_estimators == 0 {
            return Err(SpamSieveError::invalid_config(
                "forests need at least one estimator",
            ));
        }
        if !(self.svm.c > 0.0) {
            return Err(SpamSieveError::invalid_config("svm.c must be positive"));
        }
        if self.isolation_forest.max_samples == 0 {
            return Err(SpamSieveError::invalid_config(
                "isolation_forest.max_samples must be at least 1",
            ));
        }
        if let Contamination::Fixed(value) = self.isolation_forest.contamination
            && !(value > 0.0 && value <= 0.5)
        {
            return Err(SpamSieveError::invalid_config(format!(
                "isolation_forest.contamination must be in (0, 0.5], got {value}"
            )));
        }
        if self.n_jobs == Some(0) {
            return Err(SpamSieveError::invalid_config("n_jobs must be at least 1"));
        }
        Ok(())
    }

    /// Effective number of worker threads.
    pub fn threads(&self) -> usize {
        self.n_jobs.unwrap_or_else(num_cpus::get)
    }
}
