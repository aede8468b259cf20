//! Ranking of evaluated models by accuracy.

use std::cmp::Ordering;

use serde::Serialize;

use crate::ml::evaluator::ResultRecord;

/// Result records sorted by descending accuracy.
///
/// The sort is stable, so models with equal accuracy keep their registration
/// order. NaN accuracies rank last.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Leaderboard {
    entries: Vec<ResultRecord>,
}

impl Leaderboard {
    /// Rank result records.
    pub fn rank(mut results: Vec<ResultRecord>) -> Self {
        results.sort_by(|a, b| compare_accuracy(b.accuracy, a.accuracy));
        Self { entries: results }
    }

    /// Ranked records, best first.
    pub fn entries(&self) -> &[ResultRecord] {
        &self.entries
    }

    /// Best model, if any.
    pub fn best(&self) -> Option<&ResultRecord> {
        self.entries.first()
    }

    /// Model names, best first.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|r| r.model_name.as_str()).collect()
    }

    /// Number of ranked models.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was ranked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Total order on accuracies with NaN below every number.
fn compare_accuracy(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.total_cmp(&b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::metrics::{ClassificationReport, ConfusionMatrix, Metric};
    use crate::ml::registry::ModelKind;

    fn record(name: &str, accuracy: f64) -> ResultRecord {
        ResultRecord {
            model_name: name.to_string(),
            kind: ModelKind::Supervised,
            accuracy,
            predicted_labels: Vec::new(),
            scores: Vec::new(),
            confusion_matrix: ConfusionMatrix::default(),
            report: ClassificationReport::compute(&[], &[]),
            roc: Metric::unavailable("empty"),
            fit_seconds: 0.0,
        }
    }

    #[test]
    fn test_descending_with_stable_ties() {
        let board = Leaderboard::rank(vec![
            record("A", 0.70),
            record("B", 0.95),
            record("C", 0.95),
        ]);
        assert_eq!(board.names(), vec!["B", "C", "A"]);
        assert_eq!(board.best().unwrap().model_name, "B");
    }

    #[test]
    fn test_nan_ranks_last() {
        let board = Leaderboard::rank(vec![
            record("Broken", f64::NAN),
            record("Low", 0.1),
            record("High", 0.9),
        ]);
        assert_eq!(board.names(), vec!["High", "Low", "Broken"]);
    }

    #[test]
    fn test_empty() {
        let board = Leaderboard::rank(Vec::new());
        assert!(board.is_empty());
        assert!(board.best().is_none());
    }
}
