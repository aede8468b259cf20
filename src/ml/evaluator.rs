//! Train-and-score loop over a [`ModelRegistry`].
//!
//! Models are evaluated one after another on the same [`Dataset`]. A model
//! that errors or panics while training or scoring is recorded as a
//! [`ModelFailure`] and skipped; the remaining models still run.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::dataset::record::Label;
use crate::error::Result;
use crate::ml::metrics::{self, ClassificationReport, ConfusionMatrix, Metric, RocCurve};
use crate::ml::registry::{ModelKind, ModelRegistry, ModelSpec};

/// Metrics of one model on the test partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    /// Registered name.
    pub model_name: String,
    /// Training paradigm.
    pub kind: ModelKind,
    /// Fraction of correct test predictions.
    pub accuracy: f64,
    /// Predicted label per test row.
    pub predicted_labels: Vec<Label>,
    /// Spamness per test row (higher = more spam-like).
    pub scores: Vec<f64>,
    /// Confusion matrix in `[Ham, Spam]` order.
    pub confusion_matrix: ConfusionMatrix,
    /// Per-class precision/recall/F1.
    pub report: ClassificationReport,
    /// ROC curve and AUC, when defined.
    pub roc: Metric<RocCurve>,
    /// Wall-clock training time in seconds.
    pub fit_seconds: f64,
}

impl ResultRecord {
    /// Area under the ROC curve, when available.
    pub fn auc(&self) -> Option<f64> {
        self.roc.value().map(|roc| roc.auc)
    }
}

/// Step at which a model failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Fitting on the training partition.
    Train,
    /// Predicting on the test partition.
    Score,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Train => write!(f, "train"),
            FailureStage::Score => write!(f, "score"),
        }
    }
}

/// A model excluded from the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFailure {
    /// Registered name.
    pub model_name: String,
    /// Step that failed.
    pub stage: FailureStage,
    /// Error or panic message.
    pub message: String,
}

/// Outcome of evaluating a whole registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Successful models, in registration order.
    pub results: Vec<ResultRecord>,
    /// Failed models, in registration order.
    pub failures: Vec<ModelFailure>,
}

/// Evaluates registered models on a shared dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every model in registration order. Never fails as a whole.
    pub fn evaluate(&self, registry: &ModelRegistry, dataset: &Dataset) -> EvaluationReport {
        let mut report = EvaluationReport::default();

        for spec in registry.specs() {
            info!("Evaluating {} ({})", spec.name(), spec.kind());
            match self.evaluate_model(spec, dataset) {
                Ok(record) => {
                    info!(
                        "{}: accuracy {:.4}, fitted in {:.2}s",
                        record.model_name, record.accuracy, record.fit_seconds
                    );
                    report.results.push(record);
                }
                Err(failure) => {
                    warn!(
                        "{} failed during {}: {}",
                        failure.model_name, failure.stage, failure.message
                    );
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// Train, score and measure a single model.
    pub fn evaluate_model(
        &self,
        spec: &ModelSpec,
        dataset: &Dataset,
    ) -> std::result::Result<ResultRecord, ModelFailure> {
        let failure = |stage, message: String| ModelFailure {
            model_name: spec.name().to_string(),
            stage,
            message,
        };

        let started = Instant::now();
        let model = guarded(|| spec.train(&dataset.x_train, &dataset.y_train))
            .map_err(|message| failure(FailureStage::Train, message))?;
        let fit_seconds = started.elapsed().as_secs_f64();

        let scored = guarded(|| model.score(&dataset.x_test))
            .map_err(|message| failure(FailureStage::Score, message))?;

        let y_test = &dataset.y_test;
        let roc = metrics::roc_curve(y_test, &scored.scores);
        if let Metric::Unavailable { reason } = &roc {
            warn!("{}: ROC/AUC unavailable: {reason}", spec.name());
        }

        Ok(ResultRecord {
            model_name: spec.name().to_string(),
            kind: spec.kind(),
            accuracy: metrics::accuracy(y_test, &scored.labels),
            confusion_matrix: ConfusionMatrix::compute(y_test, &scored.labels),
            report: ClassificationReport::compute(y_test, &scored.labels),
            roc,
            predicted_labels: scored.labels,
            scores: scored.scores,
            fit_seconds,
        })
    }
}

/// Run `f`, turning both errors and panics into a message.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
