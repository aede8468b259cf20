//! End-to-end evaluation scenarios.

use std::fs;
use std::path::Path;

use spamsieve::config::{ModelsConfig, PipelineConfig};
use spamsieve::dataset::{Label, loader};
use spamsieve::error::{Result, SpamSieveError};
use spamsieve::feature::FeatureVector;
use spamsieve::ml::decision_tree::{DecisionTreeClassifier, DecisionTreeConfig};
use spamsieve::ml::isolation_forest::{
    Contamination, IsolationForest, IsolationForestConfig,
};
use spamsieve::ml::metrics::{self, ClassificationReport, ConfusionMatrix, Metric};
use spamsieve::ml::naive_bayes::MultinomialNaiveBayes;
use spamsieve::ml::svm::{LinearSvm, SvmConfig};
use spamsieve::ml::{
    Classifier, FailureStage, Leaderboard, ModelKind, ModelRegistry, ModelSpec, ResultRecord,
};
use spamsieve::pipeline::Pipeline;
use tempfile::TempDir;

/// 50 "winfree" spam messages interleaved with 50 generic ham sentences.
fn winfree_csv(dir: &Path) -> std::path::PathBuf {
    let subjects = [
        "quarterly budget", "team lunch", "project plan", "server migration", "holiday schedule",
        "design review", "hiring update", "customer feedback", "release notes", "office move",
    ];
    let actions = [
        "please review", "I attached", "we discussed", "let me know about", "could you update",
    ];

    let mut content = String::from("text,label\n");
    for i in 0..50 {
        content.push_str("\"winfree winfree winfree WINFREE winfree!!!\",1\n");
        content.push_str(&format!(
            "\"Hi, {} the {} before Friday's meeting.\",0\n",
            actions[i % actions.len()],
            subjects[i % subjects.len()]
        ));
    }

    let path = dir.join("winfree.csv");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_winfree_end_to_end() {
    let dir = TempDir::new().unwrap();
    let mut config = PipelineConfig::default();
    config.models.n_jobs = Some(2);
    config.models.random_forest.n_estimators = 25;
    let pipeline = Pipeline::new(config).unwrap();

    let outcome = pipeline.run(&winfree_csv(dir.path())).unwrap();
    assert_eq!(outcome.summary.n_test, 20);
    assert_eq!(outcome.summary.n_train, 80);
    assert_eq!(outcome.raw_stats.as_ref().unwrap().spam, 50);
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    assert_eq!(outcome.leaderboard.len(), 5);

    for record in outcome.leaderboard.entries() {
        assert_eq!(record.predicted_labels.len(), 20);
        assert_eq!(record.confusion_matrix.total(), 20);
    }

    let supervised = outcome
        .leaderboard
        .entries()
        .iter()
        .filter(|r| r.kind == ModelKind::Supervised);
    for record in supervised {
        assert!(
            record.accuracy >= 0.9,
            "{} reached only {}",
            record.model_name,
            record.accuracy
        );
    }

    let nb = outcome
        .leaderboard
        .entries()
        .iter()
        .find(|r| r.model_name == "Naive Bayes")
        .unwrap();
    assert_eq!(nb.confusion_matrix.false_negatives(), 0);
}

/// Dense cluster of ham plus far-away spam points.
fn separable(n_ham: usize, n_spam: usize, spam_offset: f64) -> (Vec<FeatureVector>, Vec<Label>) {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..n_ham {
        let a = (i % 10) as f64 / 100.0;
        let b = (i / 10) as f64 / 100.0;
        x.push(vec![0.5 + a, 0.5 - b, 0.2 + a * b]);
        y.push(Label::Ham);
    }
    for i in 0..n_spam {
        let step = spam_offset + i as f64;
        x.push(vec![step, -step, step * 2.0]);
        y.push(Label::Spam);
    }
    (x, y)
}

#[test]
fn test_anomaly_scores_point_towards_spam() {
    let (x_train, y_train) = separable(95, 5, 5.0);
    // 90% of the test set is anomalous.
    let (x_test, y_test) = separable(2, 18, 7.5);

    let spec = ModelSpec::anomaly("Isolation Forest", |ctx| {
        let config = IsolationForestConfig {
            n_estimators: 50,
            contamination: Contamination::TrainPrevalence,
            ..IsolationForestConfig::default()
        };
        let contamination = config.contamination.resolve(ctx.spam_prevalence)?;
        Ok(Box::new(IsolationForest::new(config, contamination, 2)))
    });

    let model = spec.train(&x_train, &y_train).unwrap();
    let scored = model.score(&x_test).unwrap();

    let roc = match metrics::roc_curve(&y_test, &scored.scores) {
        Metric::Available(roc) => roc,
        Metric::Unavailable { reason } => panic!("ROC unavailable: {reason}"),
    };
    assert!(roc.auc > 0.5, "AUC {} does not favour spam", roc.auc);

    let flagged = scored
        .labels
        .iter()
        .zip(&y_test)
        .filter(|(pred, truth)| **pred == Label::Spam && **truth == Label::Spam)
        .count();
    assert!(flagged >= 9, "only {flagged} of 18 outliers flagged as spam");
}

fn record(name: &str, accuracy: f64) -> ResultRecord {
    ResultRecord {
        model_name: name.to_string(),
        kind: ModelKind::Supervised,
        accuracy,
        predicted_labels: Vec::new(),
        scores: Vec::new(),
        confusion_matrix: ConfusionMatrix::default(),
        report: ClassificationReport::compute(&[], &[]),
        roc: Metric::unavailable("not computed"),
        fit_seconds: 0.0,
    }
}

#[test]
fn test_leaderboard_keeps_registration_order_on_ties() {
    let board = Leaderboard::rank(vec![
        record("A", 0.70),
        record("B", 0.95),
        record("C", 0.95),
    ]);
    assert_eq!(board.names(), vec!["B", "C", "A"]);
}

struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn fit(&mut self, _x: &[FeatureVector], _y: &[Label]) -> Result<()> {
        Err(SpamSieveError::model("solver diverged"))
    }

    fn predict(&self, _x: &[FeatureVector]) -> Result<Vec<Label>> {
        Err(SpamSieveError::model("not fitted"))
    }

    fn predict_proba(&self, _x: &[FeatureVector]) -> Result<Vec<f64>> {
        Err(SpamSieveError::model("not fitted"))
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

#[test]
fn test_one_failing_model_does_not_stop_the_others() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let records = loader::load_raw(
        &winfree_csv(dir.path()),
        &pipeline.config().dataset,
    )
    .unwrap();
    let cleaned = pipeline.clean(&records);

    let mut registry = ModelRegistry::new();
    registry
        .register(ModelSpec::supervised("Naive Bayes", |_| {
            Ok(Box::new(MultinomialNaiveBayes::default()))
        }))
        .unwrap()
        .register(ModelSpec::supervised("Broken", |_| Ok(Box::new(FailingClassifier))))
        .unwrap()
        .register(ModelSpec::supervised("Decision Tree", |_| {
            Ok(Box::new(DecisionTreeClassifier::new(DecisionTreeConfig::default())))
        }))
        .unwrap()
        .register(ModelSpec::supervised("SVM", |_| {
            Ok(Box::new(LinearSvm::new(SvmConfig::default())))
        }))
        .unwrap()
        .register(ModelSpec::anomaly("Isolation Forest", |ctx| {
            let config = IsolationForestConfig::default();
            let contamination = config.contamination.resolve(ctx.spam_prevalence)?;
            Ok(Box::new(IsolationForest::new(config, contamination, 1)))
        }))
        .unwrap();
    assert_eq!(registry.len(), 5);

    let outcome = pipeline.evaluate_with(&cleaned, &registry).unwrap();
    assert_eq!(outcome.leaderboard.len(), 4);
    assert!(!outcome.leaderboard.names().contains(&"Broken"));

    let accuracies: Vec<f64> = outcome
        .leaderboard
        .entries()
        .iter()
        .map(|r| r.accuracy)
        .collect();
    assert!(accuracies.windows(2).all(|w| w[0] >= w[1]));

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].model_name, "Broken");
    assert_eq!(outcome.failures[0].stage, FailureStage::Train);
    assert!(outcome.failures[0].message.contains("solver diverged"));
}

#[test]
fn test_standard_registry_order() {
    let registry = ModelRegistry::standard(&ModelsConfig::default());
    assert_eq!(
        registry.names(),
        vec![
            "Naive Bayes",
            "Decision Tree",
            "Random Forest",
            "SVM",
            "Isolation Forest"
        ]
    );
}
