//! Dataset inspection: class distribution and duplicate rows.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dataset::record::{Label, RawRecord};

/// Summary statistics of a raw dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Number of rows.
    pub rows: usize,
    /// Number of ham rows.
    pub ham: usize,
    /// Number of spam rows.
    pub spam: usize,
    /// Rows identical (text and label) to an earlier row.
    pub duplicates: usize,
    /// Rows without usable text.
    pub missing_text: usize,
}

impl DatasetStats {
    /// Compute statistics over raw records.
    pub fn compute(records: &[RawRecord]) -> Self {
        let mut seen = HashSet::new();
        let mut stats = DatasetStats {
            rows: records.len(),
            ham: 0,
            spam: 0,
            duplicates: 0,
            missing_text: 0,
        };

        for record in records {
            match record.label {
                Label::Ham => stats.ham += 1,
                Label::Spam => stats.spam += 1,
            }
            if record.text.is_none() {
                stats.missing_text += 1;
            }
            if !seen.insert(record) {
                stats.duplicates += 1;
            }
        }

        stats
    }

    /// Count of a class.
    pub fn count(&self, label: Label) -> usize {
        match label {
            Label::Ham => self.ham,
            Label::Spam => self.spam,
        }
    }

    /// Share of a class in percent (0 for an empty dataset).
    pub fn percentage(&self, label: Label) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.count(label) as f64 * 100.0 / self.rows as f64
        }
    }

    /// Fraction of spam rows in [0, 1].
    pub fn spam_ratio(&self) -> f64 {
        self.percentage(Label::Spam) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_distribution_and_duplicates() {
        let records = vec![
            RawRecord::new(Some("free money"), Label::Spam),
            RawRecord::new(Some("free money"), Label::Spam),
            RawRecord::new(Some("free money"), Label::Ham),
            RawRecord::new(Some("lunch?"), Label::Ham),
            RawRecord::new(None::<String>, Label::Ham),
        ];

        let stats = DatasetStats::compute(&records);
        assert_eq!(stats.rows, 5);
        assert_eq!(stats.ham, 3);
        assert_eq!(stats.spam, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.missing_text, 1);
        assert!((stats.percentage(Label::Ham) - 60.0).abs() < 1e-12);
        assert!((stats.spam_ratio() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_empty_dataset() {
        let stats = DatasetStats::compute(&[]);
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.percentage(Label::Spam), 0.0);
    }
}
