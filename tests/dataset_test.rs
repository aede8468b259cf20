//! Integration tests for splitting and vectorization.

use std::fs;
use std::sync::Arc;

use spamsieve::config::DatasetConfig;
use spamsieve::dataset::loader;
use spamsieve::dataset::{CleanedRecord, Dataset, Label, TrainTestSplit};
use spamsieve::feature::TfIdfVectorizer;
use tempfile::TempDir;

fn corpus(n: usize) -> Vec<CleanedRecord> {
    (0..n)
        .map(|i| {
            if i % 3 == 0 {
                CleanedRecord {
                    label: Label::Spam,
                    cleaned_text: format!("cheap offer click{} deal", i % 7),
                }
            } else {
                CleanedRecord {
                    label: Label::Ham,
                    cleaned_text: format!("weekly report draft{} review", i % 5),
                }
            }
        })
        .collect()
}

#[test]
fn test_split_is_disjoint_covering_and_reproducible() {
    let split = TrainTestSplit::new(0.25, 123);
    let first = split.split_indices(200).unwrap();
    let second = split.split_indices(200).unwrap();
    assert_eq!(first, second);

    assert_eq!(first.test.len(), 50);
    assert_eq!(first.train.len(), 150);
    assert!(first.test.iter().all(|i| !first.train.contains(i)));

    let mut all: Vec<usize> = first.train.iter().chain(&first.test).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..200).collect::<Vec<_>>());

    let other = TrainTestSplit::new(0.25, 124).split_indices(200).unwrap();
    assert_ne!(first.test, other.test);
}

#[test]
fn test_split_rejects_degenerate_inputs() {
    assert!(TrainTestSplit::new(0.2, 42).split_indices(1).is_err());
    assert!(TrainTestSplit::new(0.0, 42).split_indices(10).is_err());
    assert!(TrainTestSplit::new(1.0, 42).split_indices(10).is_err());
}

#[test]
fn test_vectorizer_is_deterministic() {
    let texts: Vec<String> = corpus(60).into_iter().map(|r| r.cleaned_text).collect();
    let vectorizer = TfIdfVectorizer::new(10).unwrap();

    let a = vectorizer.fit(&texts).unwrap();
    let b = vectorizer.fit(&texts).unwrap();
    assert_eq!(a.terms(), b.terms());
    assert!(a.len() <= 10);

    let xa = vectorizer.transform(&texts, &a).unwrap();
    let xb = vectorizer.transform(&texts, &b).unwrap();
    assert_eq!(xa, xb);
    for row in &xa {
        assert_eq!(row.len(), a.len());
        let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_dataset_shares_one_vocabulary() {
    let records = corpus(90);
    let dataset = Dataset::build(
        &records,
        &TrainTestSplit::default(),
        &TfIdfVectorizer::new(3000).unwrap(),
    )
    .unwrap();

    let vocabulary = Arc::clone(dataset.vocabulary());
    assert_eq!(vocabulary.n_documents(), dataset.x_train.len());
    assert_eq!(dataset.x_train.len() + dataset.x_test.len(), 90);
    assert_eq!(dataset.y_test.len(), dataset.x_test.len());
    assert!(
        dataset
            .x_train
            .iter()
            .chain(&dataset.x_test)
            .all(|row| row.len() == vocabulary.len())
    );
}

#[test]
fn test_enron_style_csv_round_trip() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("spam_ham_dataset.csv");
    fs::write(
        &raw,
        "id,label,text,label_num\n\
         1,ham,\"Subject: enron methanol; meter # : 988291\",0\n\
         2,spam,\"Subject: photoshop, windows, office. cheap. main trending\",1\n",
    )
    .unwrap();

    let config = DatasetConfig {
        label_column: "label_num".to_string(),
        ..DatasetConfig::default()
    };
    let records = loader::load_raw(&raw, &config).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].label, Label::Ham);
    assert_eq!(records[1].label, Label::Spam);

    let cleaned: Vec<CleanedRecord> = records
        .iter()
        .map(|r| CleanedRecord {
            label: r.label,
            cleaned_text: r.text.clone().unwrap_or_default().to_lowercase(),
        })
        .collect();
    let path = dir.path().join("cleaned.csv");
    loader::write_cleaned(&path, &cleaned).unwrap();
    assert_eq!(loader::read_cleaned(&path).unwrap(), cleaned);

    let header = fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("label,cleaned_text\n"));
}
