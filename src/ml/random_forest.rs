//! Random forest of CART trees.
//!
//! Trees are grown in parallel on a dedicated rayon pool. Each tree draws its
//! own seed from the forest seed up front, so the fitted forest does not
//! depend on the number of threads or on scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::record::Label;
use crate::error::Result;
use crate::feature::FeatureVector;
use crate::ml::classifier::{Classifier, check_dimension, check_training_set, not_fitted};
use crate::ml::decision_tree::{CartTree, ColumnMatrix, DecisionTreeConfig, MaxFeatures};
use crate::ml::thread_pool;

/// Random forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    /// Number of trees.
    pub n_estimators: usize,
    /// Maximum depth of each tree; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Candidate features per node.
    pub max_features: MaxFeatures,
    /// Draw each tree's training set with replacement.
    pub bootstrap: bool,
    /// Forest seed.
    pub seed: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl RandomForestConfig {
    fn tree_config(&self, seed: u64) -> DecisionTreeConfig {
        DecisionTreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: 1,
            max_features: self.max_features,
            seed,
        }
    }
}

/// Bagged ensemble of classification trees; probabilities are averaged.
#[derive(Debug)]
pub struct RandomForestClassifier {
    config: RandomForestConfig,
    n_jobs: usize,
    trees: Vec<CartTree>,
}

impl RandomForestClassifier {
    /// Create an unfitted forest that trains on `n_jobs` threads.
    pub fn new(config: RandomForestConfig, n_jobs: usize) -> Self {
        Self {
            config,
            n_jobs: n_jobs.max(1),
            trees: Vec::new(),
        }
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn fit_tree(&self, columns: &ColumnMatrix, y: &[Label], seed: u64) -> CartTree {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = y.len();
        let mut indices: Vec<usize> = if self.config.bootstrap {
            (0..n).map(|_| rng.random_range(0..n)).collect()
        } else {
            (0..n).collect()
        };
        CartTree::fit(
            columns,
            y,
            &mut indices,
            &self.config.tree_config(seed),
            &mut rng,
        )
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<()> {
        let n_features = check_training_set(x, y)?;
        let columns = ColumnMatrix::from_rows(x, n_features);

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let seeds: Vec<u64> = (0..self.config.n_estimators)
            .map(|_| rng.random())
            .collect();

        let pool = thread_pool(self.n_jobs, "random-forest")?;
        let trees = pool.install(|| {
            seeds
                .par_iter()
                .map(|&seed| self.fit_tree(&columns, y, seed))
                .collect::<Vec<_>>()
        });

        log::debug!(
            "Grew {} trees on {} threads (max depth {})",
            trees.len(),
            self.n_jobs,
            trees.iter().map(CartTree::depth).max().unwrap_or(0)
        );
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<Label>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| if p > 0.5 { Label::Spam } else { Label::Ham })
            .collect())
    }

    fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<f64>> {
        let first = self.trees.first().ok_or_else(|| not_fitted(self.name()))?;
        check_dimension(x, first.n_features())?;

        let n_trees = self.trees.len() as f64;
        Ok(x.par_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|tree| tree.spam_probability(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect())
    }

    fn name(&self) -> &str {
        "RandomForestClassifier"
    }
}
