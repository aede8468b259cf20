//! Labeled message datasets.
//!
//! This module owns everything between the raw table on disk and the feature
//! matrices handed to the models:
//!
//! - [`record`] - raw and cleaned records, the binary [`Label`]
//! - [`loader`] - CSV / JSON Lines readers and the cleaned-table artifact
//! - [`split`] - reproducible train/test partitioning
//! - [`stats`] - class distribution and duplicate inspection
//!
//! [`Dataset`] is the immutable, shared input of an evaluation run: the
//! train/test feature matrices plus the vocabulary that produced them.

pub mod loader;
pub mod record;
pub mod split;
pub mod stats;

use std::sync::Arc;

use log::info;

pub use record::{CleanedRecord, Label, RawRecord};
pub use split::{SplitIndices, TrainTestSplit};
pub use stats::DatasetStats;

use crate::analysis::TextNormalizer;
use crate::error::Result;
use crate::feature::{FeatureVector, TfIdfVectorizer, Vocabulary};

/// Clean every raw record, preserving order and labels.
pub fn clean_records(records: &[RawRecord], normalizer: &TextNormalizer) -> Vec<CleanedRecord> {
    records
        .iter()
        .map(|record| CleanedRecord {
            label: record.label,
            cleaned_text: normalizer.normalize_field(record.text.as_deref()),
        })
        .collect()
}

/// Train/test feature matrices built from one vocabulary.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Training features.
    pub x_train: Vec<FeatureVector>,
    /// Training labels.
    pub y_train: Vec<Label>,
    /// Test features.
    pub x_test: Vec<FeatureVector>,
    /// Test labels.
    pub y_test: Vec<Label>,
    vocabulary: Arc<Vocabulary>,
}

impl Dataset {
    /// Split cleaned records, fit the vocabulary on the training texts only and
    /// vectorize both partitions with it.
    pub fn build(
        records: &[CleanedRecord],
        splitter: &TrainTestSplit,
        vectorizer: &TfIdfVectorizer,
    ) -> Result<Self> {
        let indices = splitter.split_indices(records.len())?;
        let (train, test) = indices.select(records);

        let train_texts: Vec<String> = train.iter().map(|r| r.cleaned_text.clone()).collect();
        let test_texts: Vec<String> = test.iter().map(|r| r.cleaned_text.clone()).collect();

        let vocabulary = vectorizer.fit(&train_texts)?;
        let x_train = vectorizer.transform(&train_texts, &vocabulary)?;
        let x_test = vectorizer.transform(&test_texts, &vocabulary)?;

        info!(
            "Built dataset: {} train / {} test rows, {} features",
            x_train.len(),
            x_test.len(),
            vocabulary.len()
        );

        Ok(Dataset {
            x_train,
            y_train: train.iter().map(|r| r.label).collect(),
            x_test,
            y_test: test.iter().map(|r| r.label).collect(),
            vocabulary,
        })
    }

    /// Vocabulary shared by both partitions.
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Number of feature columns.
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }
}
