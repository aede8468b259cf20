//! Named model strategies with a uniform train/score contract.
//!
//! A [`ModelSpec`] pairs a display name with a factory producing a fresh
//! [`Estimator`]. Supervised estimators and anomaly detectors have different
//! signatures and output conventions; [`FittedModel::score`] is the one place
//! where detector output is translated into spam/ham labels and spamness
//! scores.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ModelsConfig;
use crate::dataset::record::Label;
use crate::error::{Result, SpamSieveError};
use crate::feature::FeatureVector;
use crate::ml::classifier::{AnomalyDetector, Classifier, Outlier, class_counts};
use crate::ml::decision_tree::DecisionTreeClassifier;
use crate::ml::isolation_forest::IsolationForest;
use crate::ml::naive_bayes::MultinomialNaiveBayes;
use crate::ml::random_forest::RandomForestClassifier;
use crate::ml::svm::LinearSvm;

/// Training paradigm of a model, which fixes its scoring protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Trained on labels; scores are spam probabilities.
    Supervised,
    /// Trained without labels; outliers are taken as spam.
    Anomaly,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Supervised => write!(f, "supervised"),
            ModelKind::Anomaly => write!(f, "anomaly"),
        }
    }
}

/// An unfitted estimator of either kind.
pub enum Estimator {
    /// A supervised classifier.
    Supervised(Box<dyn Classifier>),
    /// An unsupervised anomaly detector.
    Anomaly(Box<dyn AnomalyDetector>),
}

impl Estimator {
    /// Kind of the wrapped estimator.
    pub fn kind(&self) -> ModelKind {
        match self {
            Estimator::Supervised(_) => ModelKind::Supervised,
            Estimator::Anomaly(_) => ModelKind::Anomaly,
        }
    }
}

/// Facts about the training partition available to estimator factories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingContext {
    /// Number of training rows.
    pub n_samples: usize,
    /// Dimension of the feature vectors.
    pub n_features: usize,
    /// Fraction of spam among the training labels.
    pub spam_prevalence: f64,
}

impl TrainingContext {
    /// Describe a labeled training partition.
    pub fn from_training_set(x: &[FeatureVector], y: &[Label]) -> Self {
        let counts = class_counts(y);
        Self {
            n_samples: x.len(),
            n_features: x.first().map_or(0, Vec::len),
            spam_prevalence: if y.is_empty() {
                f64::NAN
            } else {
                counts[1] as f64 / y.len() as f64
            },
        }
    }
}

/// Builds a fresh estimator for one training run.
pub type EstimatorFactory = Box<dyn Fn(&TrainingContext) -> Result<Estimator> + Send + Sync>;

/// A named, registered model strategy.
pub struct ModelSpec {
    name: String,
    kind: ModelKind,
    factory: EstimatorFactory,
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl ModelSpec {
    /// Register a supervised strategy.
    pub fn supervised<S, F>(name: S, factory: F) -> Self
    where
        S: Into<String>,
        F: Fn(&TrainingContext) -> Result<Box<dyn Classifier>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: ModelKind::Supervised,
            factory: Box::new(move |ctx: &TrainingContext| {
                factory(ctx).map(Estimator::Supervised)
            }),
        }
    }

    /// Register an anomaly-detection strategy.
    pub fn anomaly<S, F>(name: S, factory: F) -> Self
    where
        S: Into<String>,
        F: Fn(&TrainingContext) -> Result<Box<dyn AnomalyDetector>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: ModelKind::Anomaly,
            factory: Box::new(move |ctx: &TrainingContext| {
                factory(ctx).map(Estimator::Anomaly)
            }),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Training paradigm.
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Fit a fresh estimator. Labels are only forwarded to supervised
    /// estimators; anomaly detectors see the training vectors alone.
    pub fn train(&self, x: &[FeatureVector], y: &[Label]) -> Result<FittedModel> {
        let context = TrainingContext::from_training_set(x, y);
        let mut estimator = (self.factory)(&context)?;
        if estimator.kind() != self.kind {
            return Err(SpamSieveError::model(format!(
                "{} is registered as {} but built a {} estimator",
                self.name,
                self.kind,
                estimator.kind()
            )));
        }

        match &mut estimator {
            Estimator::Supervised(model) => model.fit(x, y)?,
            Estimator::Anomaly(model) => model.fit(x)?,
        }

        Ok(FittedModel {
            name: self.name.clone(),
            estimator,
        })
    }
}

/// Hard labels and spamness scores of one model on one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    /// Predicted label per row.
    pub labels: Vec<Label>,
    /// Spamness per row; higher means more spam-like.
    pub scores: Vec<f64>,
}

/// A trained model ready to score.
pub struct FittedModel {
    name: String,
    estimator: Estimator,
}

impl fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedModel")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

impl FittedModel {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Training paradigm.
    pub fn kind(&self) -> ModelKind {
        self.estimator.kind()
    }

    /// Predict labels and spamness scores.
    ///
    /// Anomaly detectors report outliers as `-1` and give *higher* decision
    /// values to *normal* rows, so outliers become spam and the decision
    /// values are negated.
    pub fn score(&self, x: &[FeatureVector]) -> Result<Scored> {
        let scored = match &self.estimator {
            Estimator::Supervised(model) => Scored {
                labels: model.predict(x)?,
                scores: model.predict_proba(x)?,
            },
            Estimator::Anomaly(model) => Scored {
                labels: model
                    .predict(x)?
                    .into_iter()
                    .map(|o| match o {
                        Outlier::Outlier => Label::Spam,
                        Outlier::Inlier => Label::Ham,
                    })
                    .collect(),
                scores: model
                    .decision_function(x)?
                    .into_iter()
                    .map(|d| -d)
                    .collect(),
            },
        };

        if scored.labels.len() != x.len() || scored.scores.len() != x.len() {
            return Err(SpamSieveError::model(format!(
                "{} returned {} labels and {} scores for {} rows",
                self.name,
                scored.labels.len(),
                scored.scores.len(),
                x.len()
            )));
        }
        Ok(scored)
    }
}

/// Ordered collection of model strategies.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    specs: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The five standard strategies, in evaluation order.
    pub fn standard(config: &ModelsConfig) -> Self {
        let threads = config.threads();
        let naive_bayes = config.naive_bayes;
        let decision_tree = config.decision_tree;
        let random_forest = config.random_forest;
        let svm = config.svm;
        let isolation_forest = config.isolation_forest;

        let mut registry = Self::new();
        registry.specs = vec![
            ModelSpec::supervised("Naive Bayes", move |_| {
                Ok(Box::new(MultinomialNaiveBayes::new(naive_bayes)))
            }),
            ModelSpec::supervised("Decision Tree", move |_| {
                Ok(Box::new(DecisionTreeClassifier::new(decision_tree)))
            }),
            ModelSpec::supervised("Random Forest", move |_| {
                Ok(Box::new(RandomForestClassifier::new(random_forest, threads)))
            }),
            ModelSpec::supervised("SVM", move |_| Ok(Box::new(LinearSvm::new(svm)))),
            ModelSpec::anomaly("Isolation Forest", move |ctx| {
                let contamination = isolation_forest
                    .contamination
                    .resolve(ctx.spam_prevalence)?;
                Ok(Box::new(IsolationForest::new(
                    isolation_forest,
                    contamination,
                    threads,
                )))
            }),
        ];
        registry
    }

    /// Append a strategy; names must be unique.
    pub fn register(&mut self, spec: ModelSpec) -> Result<&mut Self> {
        if self.specs.iter().any(|s| s.name == spec.name) {
            return Err(SpamSieveError::invalid_argument(format!(
                "model {:?} is already registered",
                spec.name
            )));
        }
        self.specs.push(spec);
        Ok(self)
    }

    /// Strategies in registration order.
    pub fn specs(&self) -> &[ModelSpec] {
        &self.specs
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(ModelSpec::name).collect()
    }

    /// Number of strategies.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
