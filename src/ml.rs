//! Spam/ham models and their evaluation.
//!
//! - [`classifier`]: the [`Classifier`] and [`AnomalyDetector`] traits.
//! - Estimators: [`naive_bayes`], [`decision_tree`], [`random_forest`],
//!   [`svm`] and [`isolation_forest`].
//! - [`registry`]: the ordered set of named models and the translation of
//!   detector output into the spam/ham convention.
//! - [`metrics`], [`evaluator`] and [`leaderboard`]: scoring on the test
//!   partition and ranking by accuracy.

pub mod classifier;
pub mod decision_tree;
pub mod evaluator;
pub mod isolation_forest;
pub mod leaderboard;
pub mod metrics;
pub mod naive_bayes;
pub mod random_forest;
pub mod registry;
pub mod svm;

pub use classifier::{AnomalyDetector, Classifier, Outlier};
pub use evaluator::{EvaluationReport, Evaluator, FailureStage, ModelFailure, ResultRecord};
pub use leaderboard::Leaderboard;
pub use metrics::{ClassificationReport, ConfusionMatrix, Metric, RocCurve};
pub use registry::{FittedModel, ModelKind, ModelRegistry, ModelSpec};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Result, SpamSieveError};

/// Build a named rayon pool for ensemble fitting.
pub(crate) fn thread_pool(threads: usize, name: &'static str) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("{name}-{i}"))
        .build()
        .map_err(|e| SpamSieveError::model(format!("Failed to create thread pool: {e}")))
}
