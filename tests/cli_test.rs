//! Integration tests for the command line commands.

use std::fs;
use std::path::Path;

use clap::Parser;
use spamsieve::cli::args::SpamSieveArgs;
use spamsieve::cli::commands::execute_command;
use spamsieve::error::SpamSieveError;
use tempfile::TempDir;

fn write_raw(dir: &Path) -> std::path::PathBuf {
    let mut content = String::from("text,label\n");
    for i in 0..20 {
        content.push_str(&format!(
            "\"Congratulations!! You won a cash prize, call 0800-{i} NOW\",spam\n"
        ));
        content.push_str(&format!(
            "\"Minutes from the standup #{i} are in the shared folder.\",ham\n"
        ));
    }
    let path = dir.join("raw.csv");
    fs::write(&path, content).unwrap();
    path
}

fn run(args: &[&str]) -> spamsieve::error::Result<()> {
    let mut argv = vec!["spamsieve", "-q", "-f", "json"];
    argv.extend_from_slice(args);
    execute_command(SpamSieveArgs::try_parse_from(argv).unwrap())
}

#[test]
fn test_preprocess_then_train_with_figures() {
    let dir = TempDir::new().unwrap();
    let raw = write_raw(dir.path());
    let cleaned = dir.path().join("cleaned.csv");
    let figures = dir.path().join("figures");

    run(&["preprocess", raw.to_str().unwrap(), cleaned.to_str().unwrap()]).unwrap();
    let table = fs::read_to_string(&cleaned).unwrap();
    assert!(table.starts_with("label,cleaned_text\n"));
    assert_eq!(table.lines().count(), 41);

    run(&[
        "train",
        cleaned.to_str().unwrap(),
        "--figures-dir",
        figures.to_str().unwrap(),
        "--n-jobs",
        "2",
    ])
    .unwrap();

    for model in ["Naive_Bayes", "Decision_Tree", "Random_Forest", "SVM", "Isolation_Forest"] {
        assert!(
            figures.join(format!("confusion_matrix_{model}.json")).is_file(),
            "missing confusion matrix for {model}"
        );
    }
    assert!(figures.join("roc_curve_Naive_Bayes.json").is_file());
    // Only `run` and `explore` see the raw table.
    assert!(!figures.join("class_distribution.json").exists());
}

#[test]
fn test_explore_writes_class_distribution() {
    let dir = TempDir::new().unwrap();
    let raw = write_raw(dir.path());
    let figures = dir.path().join("figures");

    run(&[
        "explore",
        raw.to_str().unwrap(),
        "--figures-dir",
        figures.to_str().unwrap(),
    ])
    .unwrap();

    let distribution = fs::read_to_string(figures.join("class_distribution.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&distribution).unwrap();
    assert_eq!(value["counts"], serde_json::json!([20, 20]));
}

#[test]
fn test_missing_dataset_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.csv");
    let err = run(&["run", missing.to_str().unwrap()]).unwrap_err();
    assert!(matches!(err, SpamSieveError::MissingInput(_)));
}

#[test]
fn test_invalid_override_is_an_error() {
    let dir = TempDir::new().unwrap();
    let raw = write_raw(dir.path());
    let err = run(&["run", raw.to_str().unwrap(), "--max-features", "0"]).unwrap_err();
    assert!(matches!(err, SpamSieveError::Config(_)));
}
