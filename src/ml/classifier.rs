//! Estimator traits.
//!
//! Supervised models implement [`Classifier`]; unsupervised models implement
//! [`AnomalyDetector`], which never sees labels and speaks its own
//! inlier/outlier vocabulary. The registry translates between the two.

use serde::{Deserialize, Serialize};

use crate::dataset::record::Label;
use crate::error::{Result, SpamSieveError};
use crate::feature::FeatureVector;

/// A supervised binary classifier.
pub trait Classifier: Send + Sync {
    /// Fit on training vectors and their labels.
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<()>;

    /// Predict a label per row.
    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<Label>>;

    /// Probability of [`Label::Spam`] per row, in [0, 1].
    fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<f64>>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Native output of an [`AnomalyDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outlier {
    /// Normal point (native value `+1`).
    Inlier,
    /// Anomalous point (native value `-1`).
    Outlier,
}

impl Outlier {
    /// The conventional `+1` / `-1` encoding.
    pub fn native(self) -> i8 {
        match self {
            Outlier::Inlier => 1,
            Outlier::Outlier => -1,
        }
    }
}

/// An unsupervised anomaly detector.
pub trait AnomalyDetector: Send + Sync {
    /// Fit on unlabeled training vectors.
    fn fit(&mut self, x: &[FeatureVector]) -> Result<()>;

    /// Inlier/outlier decision per row.
    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<Outlier>>;

    /// Normality score per row: higher means more normal, negative means
    /// the row is classified as an outlier.
    fn decision_function(&self, x: &[FeatureVector]) -> Result<Vec<f64>>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Check a training matrix and return its dimension.
pub(crate) fn check_features(x: &[FeatureVector]) -> Result<usize> {
    let first = x
        .first()
        .ok_or_else(|| SpamSieveError::model("cannot fit on an empty training set"))?;
    let n_features = first.len();
    if n_features == 0 {
        return Err(SpamSieveError::model("training vectors have no features"));
    }
    if let Some(row) = x.iter().position(|row| row.len() != n_features) {
        return Err(SpamSieveError::model(format!(
            "row {row} has {} features, expected {n_features}",
            x[row].len()
        )));
    }
    if x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(SpamSieveError::model("training vectors contain non-finite values"));
    }
    Ok(n_features)
}

/// Check a labeled training set and return its dimension.
pub(crate) fn check_training_set(x: &[FeatureVector], y: &[Label]) -> Result<usize> {
    if x.len() != y.len() {
        return Err(SpamSieveError::model(format!(
            "{} training vectors but {} labels",
            x.len(),
            y.len()
        )));
    }
    check_features(x)
}

/// Check that rows to score match the fitted dimension.
pub(crate) fn check_dimension(x: &[FeatureVector], n_features: usize) -> Result<()> {
    match x.iter().position(|row| row.len() != n_features) {
        Some(row) => Err(SpamSieveError::model(format!(
            "row {row} has {} features, model was fitted on {n_features}",
            x[row].len()
        ))),
        None => Ok(()),
    }
}

/// Per-class sample counts `[ham, spam]`.
pub(crate) fn class_counts(y: &[Label]) -> [usize; 2] {
    let mut counts = [0; 2];
    for label in y {
        counts[label.index()] += 1;
    }
    counts
}

/// Error returned when scoring before fitting.
pub(crate) fn not_fitted(name: &str) -> SpamSieveError {
    SpamSieveError::model(format!("{name} is not fitted"))
}
