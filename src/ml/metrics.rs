//! Evaluation metrics over the test partition.
//!
//! Metrics that can be undefined for a given test set (the ROC curve needs
//! both classes and non-constant scores) are wrapped in [`Metric`] so that an
//! unavailable value is explicit instead of a silently missing field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::record::Label;

/// A metric that may be undefined for the data at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metric<T> {
    /// The metric was computed.
    Available(T),
    /// The metric is undefined; `reason` says why.
    Unavailable {
        /// Human-readable cause.
        reason: String,
    },
}

impl<T> Metric<T> {
    /// Mark a metric as unavailable.
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Metric::Unavailable {
            reason: reason.into(),
        }
    }

    /// The computed value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Available(value) => Some(value),
            Metric::Unavailable { .. } => None,
        }
    }

    /// Whether the metric was computed.
    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Available(_))
    }
}

/// Fraction of matching labels; NaN for empty input.
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// 2x2 confusion matrix; rows are true labels, columns predicted labels,
/// both in `[Ham, Spam]` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// `matrix[true][predicted]`.
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Count label pairs.
    pub fn compute(y_true: &[Label], y_pred: &[Label]) -> Self {
        let mut matrix = [[0; 2]; 2];
        for (t, p) in y_true.iter().zip(y_pred) {
            matrix[t.index()][p.index()] += 1;
        }
        Self { matrix }
    }

    /// Ham predicted as ham.
    pub fn true_negatives(&self) -> usize {
        self.matrix[0][0]
    }

    /// Ham predicted as spam.
    pub fn false_positives(&self) -> usize {
        self.matrix[0][1]
    }

    /// Spam predicted as ham.
    pub fn false_negatives(&self) -> usize {
        self.matrix[1][0]
    }

    /// Spam predicted as spam.
    pub fn true_positives(&self) -> usize {
        self.matrix[1][1]
    }

    /// Total number of rows.
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9}", "true\\pred", "Ham", "Spam")?;
        for label in Label::ORDER {
            let row = self.matrix[label.index()];
            writeln!(f, "{:>12} {:>9} {:>9}", label.name(), row[0], row[1])?;
        }
        Ok(())
    }
}

/// Precision, recall and F1 of one class (or an average).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Precision; 0 when nothing was predicted as this class.
    pub precision: f64,
    /// Recall; 0 when the class is absent.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of true rows of the class.
    pub support: usize,
}

/// Per-class and averaged precision/recall/F1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Metrics for `[Ham, Spam]`.
    pub classes: [ClassMetrics; 2],
    /// Overall accuracy.
    pub accuracy: f64,
    /// Unweighted mean over classes.
    pub macro_avg: ClassMetrics,
    /// Support-weighted mean over classes.
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Compute the report from true and predicted labels.
    pub fn compute(y_true: &[Label], y_pred: &[Label]) -> Self {
        let cm = ConfusionMatrix::compute(y_true, y_pred);
        let ratio = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };

        let classes = Label::ORDER.map(|label| {
            let i = label.index();
            let tp = cm.matrix[i][i];
            let predicted = cm.matrix[0][i] + cm.matrix[1][i];
            let support = cm.matrix[i][0] + cm.matrix[i][1];
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        });

        let total: usize = classes.iter().map(|c| c.support).sum();
        let average = |weight: &dyn Fn(&ClassMetrics) -> f64| {
            let norm: f64 = classes.iter().map(weight).sum();
            let mean = |field: fn(&ClassMetrics) -> f64| {
                if norm == 0.0 {
                    0.0
                } else {
                    classes.iter().map(|c| weight(c) * field(c)).sum::<f64>() / norm
                }
            };
            ClassMetrics {
                precision: mean(|c| c.precision),
                recall: mean(|c| c.recall),
                f1: mean(|c| c.f1),
                support: total,
            }
        };

        Self {
            macro_avg: average(&|_| 1.0),
            weighted_avg: average(&|c| c.support as f64),
            classes,
            accuracy: accuracy(y_true, y_pred),
        }
    }

    /// Metrics of one class.
    pub fn class(&self, label: Label) -> &ClassMetrics {
        &self.classes[label.index()]
    }
}

/// Width of the row-label column in the text report.
const LABEL_WIDTH: usize = 12;

fn write_report_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{name:>LABEL_WIDTH$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
        m.precision, m.recall, m.f1, m.support
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>LABEL_WIDTH$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for label in Label::ORDER {
            write_report_row(f, label.name(), self.class(label))?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>LABEL_WIDTH$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.weighted_avg.support
        )?;
        write_report_row(f, "macro avg", &self.macro_avg)?;
        write_report_row(f, "weighted avg", &self.weighted_avg)
    }
}

/// Receiver operating characteristic curve with its area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    /// False positive rates, non-decreasing from 0 to 1.
    pub fpr: Vec<f64>,
    /// True positive rates, non-decreasing from 0 to 1.
    pub tpr: Vec<f64>,
    /// Score thresholds; the first one is `+inf` (serialized as `null`).
    pub thresholds: Vec<f64>,
    /// Area under the curve.
    pub auc: f64,
}

/// ROC curve of spam scores (higher = more spam-like).
///
/// Unavailable when the test labels hold a single class, when every score is
/// identical, or when a score is not finite.
pub fn roc_curve(y_true: &[Label], scores: &[f64]) -> Metric<RocCurve> {
    if y_true.len() != scores.len() {
        return Metric::unavailable(format!(
            "{} labels but {} scores",
            y_true.len(),
            scores.len()
        ));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Metric::unavailable("scores contain non-finite values");
    }
    let positives = y_true.iter().filter(|l| **l == Label::Spam).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Metric::unavailable("only one class present in the test labels");
    }
    if scores.iter().all(|s| *s == scores[0]) {
        return Metric::unavailable("scores are constant");
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    // Cumulative counts at each distinct threshold.
    let mut fps = Vec::new();
    let mut tps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut tp, mut fp) = (0usize, 0usize);
    for (pos, &i) in order.iter().enumerate() {
        if y_true[i] == Label::Spam {
            tp += 1;
        } else {
            fp += 1;
        }
        let last = pos + 1 == order.len();
        if last || scores[order[pos + 1]] != scores[i] {
            fps.push(fp);
            tps.push(tp);
            thresholds.push(scores[i]);
        }
    }

    // Drop points collinear with their neighbours.
    if fps.len() > 2 {
        let second_diff = |v: &[usize], k: usize| v[k + 1] + v[k - 1] != 2 * v[k];
        let keep: Vec<bool> = (0..fps.len())
            .map(|k| k == 0 || k + 1 == fps.len() || second_diff(&fps, k) || second_diff(&tps, k))
            .collect();
        let filter = |v: Vec<usize>| -> Vec<usize> {
            v.into_iter()
                .zip(&keep)
                .filter_map(|(x, k)| k.then_some(x))
                .collect()
        };
        fps = filter(fps);
        tps = filter(tps);
        thresholds = thresholds
            .into_iter()
            .zip(&keep)
            .filter_map(|(t, k)| k.then_some(t))
            .collect();
    }

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    fpr.extend(fps.iter().map(|&f| f as f64 / negatives as f64));
    tpr.extend(tps.iter().map(|&t| t as f64 / positives as f64));
    thresholds.insert(0, f64::INFINITY);

    let auc = auc(&fpr, &tpr);
    Metric::Available(RocCurve {
        fpr,
        tpr,
        thresholds,
        auc,
    })
}

/// Trapezoidal area under a curve with non-decreasing `x`.
pub fn auc(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}
