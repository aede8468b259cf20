//! Linear support vector machine.
//!
//! Trained with dual coordinate descent on the L1 (hinge) loss, with the bias
//! folded in as a constant feature. Probabilities come from a Platt sigmoid
//! fitted on the training decision values; class predictions use the sign of
//! the decision value, not the probability.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::dataset::record::Label;
use crate::error::{Result, SpamSieveError};
use crate::feature::FeatureVector;
use crate::ml::classifier::{Classifier, check_dimension, check_training_set, class_counts, not_fitted};

/// How misclassification costs are weighted per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Both classes cost the same.
    Uniform,
    /// Weights inversely proportional to class frequency:
    /// `n_samples / (2 * n_class)`.
    Balanced,
}

/// SVM hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    /// Regularization strength (inverse).
    pub c: f64,
    /// Class weighting scheme.
    pub class_weight: ClassWeight,
    /// Maximum passes over the training set.
    pub max_iter: usize,
    /// Stopping tolerance on the projected gradient.
    pub tolerance: f64,
    /// Seed of the coordinate order.
    pub seed: u64,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            class_weight: ClassWeight::Balanced,
            max_iter: 1000,
            tolerance: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct FittedParams {
    weights: Vec<f64>,
    bias: f64,
    /// Platt sigmoid `P(spam | f) = 1 / (1 + exp(a * f + b))`.
    platt_a: f64,
    platt_b: f64,
}

impl FittedParams {
    fn decision(&self, row: &[f64]) -> f64 {
        row.iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.bias
    }
}

/// Linear SVM with class weighting and Platt-scaled probabilities.
#[derive(Debug, Clone)]
pub struct LinearSvm {
    config: SvmConfig,
    params: Option<FittedParams>,
}

impl LinearSvm {
    /// Create an unfitted model.
    pub fn new(config: SvmConfig) -> Self {
        Self {
            config,
            params: None,
        }
    }

    fn params(&self) -> Result<&FittedParams> {
        self.params.as_ref().ok_or_else(|| not_fitted(self.name()))
    }

    /// Signed distance-like score; positive means spam.
    pub fn decision_function(&self, x: &[FeatureVector]) -> Result<Vec<f64>> {
        let params = self.params()?;
        check_dimension(x, params.weights.len())?;
        Ok(x.iter().map(|row| params.decision(row)).collect())
    }
}

impl Default for LinearSvm {
    fn default() -> Self {
        Self::new(SvmConfig::default())
    }
}

/// Nonzero entries of a row.
type SparseRow = Vec<(usize, f64)>;

impl Classifier for LinearSvm {
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<()> {
        let n_features = check_training_set(x, y)?;
        let counts = class_counts(y);
        if counts.contains(&0) {
            return Err(SpamSieveError::model(
                "SVM training needs samples of both classes",
            ));
        }

        let n = y.len();
        let class_cost = match self.config.class_weight {
            ClassWeight::Uniform => [1.0, 1.0],
            ClassWeight::Balanced => counts.map(|c| n as f64 / (2.0 * c as f64)),
        };
        let sign = |label: Label| if label == Label::Spam { 1.0 } else { -1.0 };

        let rows: Vec<SparseRow> = x
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, v)| **v != 0.0)
                    .map(|(j, v)| (j, *v))
                    .collect()
            })
            .collect();
        // Squared norms including the constant bias feature.
        let q_diag: Vec<f64> = rows
            .iter()
            .map(|row| row.iter().map(|(_, v)| v * v).sum::<f64>() + 1.0)
            .collect();
        let upper: Vec<f64> = y
            .iter()
            .map(|label| self.config.c * class_cost[label.index()])
            .collect();

        let mut alpha = vec![0.0; n];
        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let mut converged = false;
        for iteration in 0..self.config.max_iter {
            order.shuffle(&mut rng);
            let mut pg_max = f64::NEG_INFINITY;
            let mut pg_min = f64::INFINITY;

            for &i in &order {
                let yi = sign(y[i]);
                let margin = rows[i].iter().map(|(j, v)| weights[*j] * v).sum::<f64>() + bias;
                let gradient = yi * margin - 1.0;

                let projected = if alpha[i] == 0.0 {
                    gradient.min(0.0)
                } else if alpha[i] >= upper[i] {
                    gradient.max(0.0)
                } else {
                    gradient
                };
                pg_max = pg_max.max(projected);
                pg_min = pg_min.min(projected);

                if projected.abs() > 1e-12 {
                    let old = alpha[i];
                    alpha[i] = (old - gradient / q_diag[i]).clamp(0.0, upper[i]);
                    let delta = (alpha[i] - old) * yi;
                    for (j, v) in &rows[i] {
                        weights[*j] += delta * v;
                    }
                    bias += delta;
                }
            }

            if pg_max - pg_min <= self.config.tolerance {
                log::debug!("SVM converged after {} passes", iteration + 1);
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!(
                "SVM reached max_iter={} without converging",
                self.config.max_iter
            );
        }

        let mut params = FittedParams {
            weights,
            bias,
            platt_a: 0.0,
            platt_b: 0.0,
        };
        let decisions: Vec<f64> = x.iter().map(|row| params.decision(row)).collect();
        let (a, b) = fit_platt(&decisions, y);
        params.platt_a = a;
        params.platt_b = b;

        self.params = Some(params);
        Ok(())
    }

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<Label>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|f| if f > 0.0 { Label::Spam } else { Label::Ham })
            .collect())
    }

    fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<f64>> {
        let params = self.params()?;
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|f| sigmoid_predict(f, params.platt_a, params.platt_b))
            .collect())
    }

    fn name(&self) -> &str {
        "LinearSvm"
    }
}

/// `1 / (1 + exp(a * f + b))`, evaluated without overflow.
fn sigmoid_predict(f: f64, a: f64, b: f64) -> f64 {
    let z = a * f + b;
    if z >= 0.0 {
        (-z).exp() / (1.0 + (-z).exp())
    } else {
        1.0 / (1.0 + z.exp())
    }
}

/// Fit Platt's sigmoid by Newton's method with backtracking
/// (Lin, Lin & Weng, 2007), using smoothed targets.
fn fit_platt(decisions: &[f64], y: &[Label]) -> (f64, f64) {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let counts = class_counts(y);
    let (prior0, prior1) = (counts[0] as f64, counts[1] as f64);
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = y
        .iter()
        .map(|label| if *label == Label::Spam { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&targets)
            .map(|(f, t)| {
                let z = f * a + b;
                if z >= 0.0 {
                    t * z + (1.0 + (-z).exp()).ln()
                } else {
                    (t - 1.0) * z + (1.0 + z.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (f, t) in decisions.iter().zip(&targets) {
            let z = f * a + b;
            let (p, q) = if z >= 0.0 {
                let e = (-z).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = z.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let (new_a, new_b) = (a + step * da, b + step * db);
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            log::debug!("Platt scaling line search failed");
            break;
        }
    }

    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<FeatureVector>, Vec<Label>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.05;
            x.push(vec![0.8 + jitter, 0.1]);
            y.push(Label::Spam);
            x.push(vec![0.1, 0.8 + jitter]);
            y.push(Label::Ham);
        }
        (x, y)
    }

    #[test]
    fn test_separates_linearly_separable_data() {
        let (x, y) = separable();
        let mut svm = LinearSvm::default();
        svm.fit(&x, &y).unwrap();

        assert_eq!(svm.predict(&x).unwrap(), y);
        let decisions = svm.decision_function(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!(decisions[0] > 0.0);
        assert!(decisions[1] < 0.0);
    }

    #[test]
    fn test_probabilities_are_calibrated_in_direction() {
        let (x, y) = separable();
        let mut svm = LinearSvm::default();
        svm.fit(&x, &y).unwrap();

        let proba = svm.predict_proba(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!(proba[0] > 0.5, "spam probability {}", proba[0]);
        assert!(proba[1] < 0.5, "spam probability {}", proba[1]);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_balanced_weights_favor_minority_class() {
        // 5 spam vs 45 ham, overlapping on feature 0.
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..45 {
            x.push(vec![(i % 9) as f64 / 10.0, 1.0]);
            y.push(Label::Ham);
        }
        for i in 0..5 {
            x.push(vec![0.6 + i as f64 / 20.0, 1.0]);
            y.push(Label::Spam);
        }

        let fit_recall = |class_weight| {
            let mut svm = LinearSvm::new(SvmConfig {
                class_weight,
                ..SvmConfig::default()
            });
            svm.fit(&x, &y).unwrap();
            svm.predict(&x[45..])
                .unwrap()
                .iter()
                .filter(|l| **l == Label::Spam)
                .count()
        };

        assert!(fit_recall(ClassWeight::Balanced) >= fit_recall(ClassWeight::Uniform));
        assert!(fit_recall(ClassWeight::Balanced) > 0);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let mut svm = LinearSvm::default();
        let result = svm.fit(&[vec![1.0], vec![0.5]], &[Label::Ham, Label::Ham]);
        assert!(matches!(result, Err(SpamSieveError::Model(_))));
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert!((sigmoid_predict(0.0, 1.0, 0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid_predict(-1000.0, 1.0, 0.0) > 0.999);
        assert!(sigmoid_predict(1000.0, 1.0, 0.0) < 1e-6);
    }
}
