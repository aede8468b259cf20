//! Output formatting for CLI commands.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, SpamSieveArgs};
use crate::dataset::record::Label;
use crate::dataset::DatasetStats;
use crate::error::Result;
use crate::ml::metrics::{ClassificationReport, ConfusionMatrix, Metric};
use crate::ml::{ModelFailure, ModelKind, ResultRecord};
use crate::pipeline::{DatasetSummary, RunOutcome};

/// Result structure for dataset exploration.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExploreResult {
    pub path: String,
    pub stats: DatasetStats,
}

/// Result structure for preprocessing.
#[derive(Debug, Serialize, Deserialize)]
pub struct PreprocessResult {
    pub raw: String,
    pub cleaned: String,
    pub rows: usize,
    pub empty_after_cleaning: usize,
}

/// One model of an evaluation run.
#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub rank: usize,
    pub model_name: String,
    pub kind: ModelKind,
    pub accuracy: f64,
    pub auc: Option<f64>,
    pub auc_unavailable: Option<String>,
    pub confusion_matrix: ConfusionMatrix,
    pub report: ClassificationReport,
    pub fit_seconds: f64,
}

impl ModelSummary {
    fn from_record(rank: usize, record: &ResultRecord) -> Self {
        let auc_unavailable = match &record.roc {
            Metric::Available(_) => None,
            Metric::Unavailable { reason } => Some(reason.clone()),
        };
        Self {
            rank,
            model_name: record.model_name.clone(),
            kind: record.kind,
            accuracy: record.accuracy,
            auc: record.auc(),
            auc_unavailable,
            confusion_matrix: record.confusion_matrix,
            report: record.report.clone(),
            fit_seconds: record.fit_seconds,
        }
    }
}

/// Result structure for an evaluation run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub raw_stats: Option<DatasetStats>,
    pub dataset: DatasetSummary,
    pub leaderboard: Vec<ModelSummary>,
    pub failures: Vec<ModelFailure>,
}

impl RunReport {
    /// Summarize a pipeline outcome, best model first.
    pub fn new(outcome: &RunOutcome) -> Self {
        Self {
            generated_at: Utc::now(),
            raw_stats: outcome.raw_stats.clone(),
            dataset: outcome.summary.clone(),
            leaderboard: outcome
                .leaderboard
                .entries()
                .iter()
                .enumerate()
                .map(|(i, record)| ModelSummary::from_record(i + 1, record))
                .collect(),
            failures: outcome.failures.clone(),
        }
    }
}

impl fmt::Display for ExploreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset: {}", self.path)?;
        write_stats(f, &self.stats)
    }
}

impl fmt::Display for PreprocessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Read {} rows from {}", self.rows, self.raw)?;
        writeln!(f, "Wrote cleaned table to {}", self.cleaned)?;
        if self.empty_after_cleaning > 0 {
            writeln!(
                f,
                "{} messages are empty after cleaning",
                self.empty_after_cleaning
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stats) = &self.raw_stats {
            write_stats(f, stats)?;
            writeln!(f)?;
        }

        let d = &self.dataset;
        writeln!(
            f,
            "Split: {} train ({} spam) / {} test ({} spam), {} features",
            d.n_train, d.train_spam, d.n_test, d.test_spam, d.n_features
        )?;

        for model in &self.leaderboard {
            writeln!(f)?;
            let title = format!("{} ({})", model.model_name, model.kind);
            writeln!(f, "{title}")?;
            writeln!(f, "{}", "─".repeat(title.chars().count()))?;
            writeln!(f, "Accuracy: {:.4}", model.accuracy)?;
            writeln!(f)?;
            write!(f, "{}", model.report)?;
            writeln!(f)?;
            writeln!(f, "Confusion matrix:")?;
            write!(f, "{}", model.confusion_matrix)?;
            match (&model.auc, &model.auc_unavailable) {
                (Some(auc), _) => writeln!(f, "AUC: {auc:.4}")?,
                (None, Some(reason)) => writeln!(f, "AUC: unavailable ({reason})")?,
                (None, None) => writeln!(f, "AUC: unavailable")?,
            }
        }

        writeln!(f)?;
        writeln!(f, "Leaderboard:")?;
        writeln!(f, "{:>4}  {:<20} {:>9} {:>9}", "#", "Model", "Accuracy", "AUC")?;
        for model in &self.leaderboard {
            let auc = model
                .auc
                .map(|auc| format!("{auc:.4}"))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                f,
                "{:>4}  {:<20} {:>9.4} {:>9}",
                model.rank, model.model_name, model.accuracy, auc
            )?;
        }

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed models:")?;
            for failure in &self.failures {
                writeln!(
                    f,
                    "  {} ({}): {}",
                    failure.model_name, failure.stage, failure.message
                )?;
            }
        }
        Ok(())
    }
}

fn write_stats(f: &mut fmt::Formatter<'_>, stats: &DatasetStats) -> fmt::Result {
    writeln!(f, "Rows: {}", stats.rows)?;
    for label in Label::ORDER {
        writeln!(
            f,
            "  {:<5} {:>8} ({:.2}%)",
            label.name(),
            stats.count(label),
            stats.percentage(label)
        )?;
    }
    writeln!(f, "Duplicates: {}", stats.duplicates)?;
    writeln!(f, "Without text: {}", stats.missing_text)
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + fmt::Display>(
    message: &str,
    result: &T,
    args: &SpamSieveArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: fmt::Display>(message: &str, result: &T, args: &SpamSieveArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!("{}", "═".repeat(message.chars().count()));
    }
    print!("{result}");
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &SpamSieveArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Confusion matrix plot data.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfusionMatrixFigure {
    pub model_name: String,
    pub labels: [String; 2],
    pub matrix: [[usize; 2]; 2],
}

/// ROC curve plot data. The first threshold is infinite and serialized as `null`.
#[derive(Debug, Serialize)]
pub struct RocCurveFigure {
    pub model_name: String,
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
    pub auc: f64,
}

/// Class distribution plot data.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassDistributionFigure {
    pub labels: [String; 2],
    pub counts: [usize; 2],
    pub percentages: [f64; 2],
}

/// `<prefix>_<Model_Name>.json`, with spaces in the model name replaced.
pub fn figure_file_name(prefix: &str, model_name: &str) -> String {
    format!("{prefix}_{}.json", model_name.replace(' ', "_"))
}

fn label_names() -> [String; 2] {
    Label::ORDER.map(|label| label.name().to_string())
}

fn write_figure<T: Serialize>(dir: &Path, file_name: &str, figure: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, serde_json::to_string_pretty(figure)?)?;
    log::debug!("Wrote {}", path.display());
    Ok(path)
}

/// Write the class distribution of a raw dataset.
pub fn export_class_distribution(dir: &Path, stats: &DatasetStats) -> Result<PathBuf> {
    let figure = ClassDistributionFigure {
        labels: label_names(),
        counts: Label::ORDER.map(|label| stats.count(label)),
        percentages: Label::ORDER.map(|label| stats.percentage(label)),
    };
    write_figure(dir, "class_distribution.json", &figure)
}

/// Write confusion matrices and, where available, ROC curves of every
/// ranked model.
pub fn export_model_figures(dir: &Path, outcome: &RunOutcome) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for record in outcome.leaderboard.entries() {
        let confusion = ConfusionMatrixFigure {
            model_name: record.model_name.clone(),
            labels: label_names(),
            matrix: record.confusion_matrix.matrix,
        };
        written.push(write_figure(
            dir,
            &figure_file_name("confusion_matrix", &record.model_name),
            &confusion,
        )?);

        if let Some(roc) = record.roc.value() {
            let curve = RocCurveFigure {
                model_name: record.model_name.clone(),
                fpr: roc.fpr.clone(),
                tpr: roc.tpr.clone(),
                thresholds: roc.thresholds.clone(),
                auc: roc.auc,
            };
            written.push(write_figure(
                dir,
                &figure_file_name("roc_curve", &record.model_name),
                &curve,
            )?);
        }
    }
    Ok(written)
}
