//! Isolation forest anomaly detector.
//!
//! Each tree isolates a random subsample by splitting on random features at
//! random thresholds; anomalies end up in short paths. Scores follow the usual
//! convention for detectors in this crate: `decision_function` is higher for
//! normal rows and negative for rows predicted as outliers, with the zero
//! point placed so that a `contamination` fraction of the training rows falls
//! below it.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpamSieveError};
use crate::feature::FeatureVector;
use crate::ml::classifier::{AnomalyDetector, Outlier, check_dimension, check_features, not_fitted};
use crate::ml::thread_pool;

/// Smallest contamination derived from the training partition.
const MIN_CONTAMINATION: f64 = 1e-3;
/// Largest accepted contamination.
const MAX_CONTAMINATION: f64 = 0.5;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected share of outliers in the training data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contamination {
    /// A fixed fraction in (0, 0.5].
    Fixed(f64),
    /// The spam share of the training partition, clamped into range.
    TrainPrevalence,
}

impl Default for Contamination {
    fn default() -> Self {
        Contamination::Fixed(0.2)
    }
}

impl Contamination {
    /// Resolve to a fraction, given the spam share of the training labels.
    pub fn resolve(self, spam_prevalence: f64) -> Result<f64> {
        match self {
            Contamination::Fixed(value) if value > 0.0 && value <= MAX_CONTAMINATION => Ok(value),
            Contamination::Fixed(value) => Err(SpamSieveError::invalid_config(format!(
                "contamination must be in (0, 0.5], got {value}"
            ))),
            Contamination::TrainPrevalence => {
                if !spam_prevalence.is_finite() {
                    return Err(SpamSieveError::model("training prevalence is undefined"));
                }
                let clamped = spam_prevalence.clamp(MIN_CONTAMINATION, MAX_CONTAMINATION);
                if clamped != spam_prevalence {
                    log::warn!(
                        "Training spam share {spam_prevalence:.4} is outside the contamination \
                         range, using {clamped:.4}"
                    );
                }
                Ok(clamped)
            }
        }
    }
}

impl fmt::Display for Contamination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contamination::Fixed(value) => write!(f, "{value}"),
            Contamination::TrainPrevalence => write!(f, "train_prevalence"),
        }
    }
}

impl FromStr for Contamination {
    type Err = SpamSieveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prevalence" | "train_prevalence" => Ok(Contamination::TrainPrevalence),
            other => other.parse::<f64>().map(Contamination::Fixed).map_err(|_| {
                SpamSieveError::invalid_argument(format!(
                    "contamination must be a number or \"prevalence\", got {s:?}"
                ))
            }),
        }
    }
}

/// Isolation forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestConfig {
    /// Number of trees.
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the training size).
    pub max_samples: usize,
    /// Expected outlier share; sets the decision threshold.
    pub contamination: Contamination,
    /// Forest seed.
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: Contamination::default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum ITreeNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<ITreeNode>,
        right: Box<ITreeNode>,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: ITreeNode,
}

impl IsolationTree {
    fn fit(x: &[FeatureVector], max_samples: usize, height_limit: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sample = index::sample(&mut rng, x.len(), max_samples).into_vec();

        // Features constant over the subsample stay constant in every node.
        let n_features = x[0].len();
        let mut candidates: Vec<usize> = (0..n_features)
            .filter(|&f| {
                let first = x[sample[0]][f];
                sample.iter().any(|&s| x[s][f] != first)
            })
            .collect();

        let root = Self::grow(x, &mut sample, &mut candidates, 0, height_limit, &mut rng);
        Self { root }
    }

    fn grow(
        x: &[FeatureVector],
        sample: &mut [usize],
        candidates: &mut [usize],
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> ITreeNode {
        let leaf = ITreeNode::Leaf { size: sample.len() };
        if depth >= height_limit || sample.len() <= 1 {
            return leaf;
        }

        // Draw features without replacement until one varies in this node.
        let mut chosen = None;
        for i in 0..candidates.len() {
            let j = rng.random_range(i..candidates.len());
            candidates.swap(i, j);
            let feature = candidates[i];
            let (min, max) = sample
                .iter()
                .map(|&s| x[s][feature])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if max > min {
                chosen = Some((feature, min, max));
                break;
            }
        }
        let Some((feature, min, max)) = chosen else {
            return leaf;
        };

        let threshold = rng.random_range(min..max);
        let mut n_left = 0;
        for i in 0..sample.len() {
            if x[sample[i]][feature] <= threshold {
                sample.swap(n_left, i);
                n_left += 1;
            }
        }

        let (left, right) = sample.split_at_mut(n_left);
        ITreeNode::Split {
            feature,
            threshold,
            left: Box::new(Self::grow(x, left, candidates, depth + 1, height_limit, rng)),
            right: Box::new(Self::grow(x, right, candidates, depth + 1, height_limit, rng)),
        }
    }

    /// Depth of the leaf reached by `row`, plus the expected remaining depth
    /// of an unbuilt subtree holding that leaf's samples.
    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                ITreeNode::Leaf { size } => return depth + average_path_length(*size),
                ITreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` nodes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile, `q` in [0, 100].
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let position = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}

#[derive(Debug)]
struct FittedForest {
    trees: Vec<IsolationTree>,
    n_features: usize,
    /// Normalizer `c(max_samples)` of the mean path length.
    normalizer: f64,
    /// Training-score percentile at the contamination level.
    offset: f64,
}

/// Isolation forest.
#[derive(Debug)]
pub struct IsolationForest {
    config: IsolationForestConfig,
    contamination: f64,
    n_jobs: usize,
    fitted: Option<FittedForest>,
}

impl IsolationForest {
    /// Create an unfitted forest with an already resolved contamination.
    pub fn new(config: IsolationForestConfig, contamination: f64, n_jobs: usize) -> Self {
        Self {
            config,
            contamination,
            n_jobs: n_jobs.max(1),
            fitted: None,
        }
    }

    /// Contamination used to place the threshold.
    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    fn fitted(&self) -> Result<&FittedForest> {
        self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))
    }

    /// Raw normality score in [-1, 0): `-2^(-E[h(x)] / c(max_samples))`.
    pub fn score_samples(&self, x: &[FeatureVector]) -> Result<Vec<f64>> {
        let fitted = self.fitted()?;
        check_dimension(x, fitted.n_features)?;
        let pool = thread_pool(self.n_jobs, "isolation-forest")?;
        Ok(pool.install(|| Self::raw_scores(&fitted.trees, fitted.normalizer, x)))
    }

    fn raw_scores(trees: &[IsolationTree], normalizer: f64, x: &[FeatureVector]) -> Vec<f64> {
        let n_trees = trees.len() as f64;
        x.par_iter()
            .map(|row| {
                let mean_depth =
                    trees.iter().map(|tree| tree.path_length(row)).sum::<f64>() / n_trees;
                -(2f64.powf(-mean_depth / normalizer))
            })
            .collect()
    }
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, x: &[FeatureVector]) -> Result<()> {
        let n_features = check_features(x)?;
        if !(self.contamination > 0.0 && self.contamination <= MAX_CONTAMINATION) {
            return Err(SpamSieveError::model(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }

        let max_samples = self.config.max_samples.min(x.len()).max(1);
        let height_limit = (max_samples.max(2) as f64).log2().ceil() as usize;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let seeds: Vec<u64> = (0..self.config.n_estimators)
            .map(|_| rng.random())
            .collect();

        let pool = thread_pool(self.n_jobs, "isolation-forest")?;
        let (trees, train_scores, normalizer) = pool.install(|| {
            let trees: Vec<IsolationTree> = seeds
                .par_iter()
                .map(|&seed| IsolationTree::fit(x, max_samples, height_limit, seed))
                .collect();
            let normalizer = average_path_length(max_samples).max(1.0);
            let scores = Self::raw_scores(&trees, normalizer, x);
            (trees, scores, normalizer)
        });

        let offset = percentile(&train_scores, 100.0 * self.contamination);
        log::debug!(
            "Isolation forest: {} trees, {max_samples} samples each, offset {offset:.6}",
            trees.len()
        );

        self.fitted = Some(FittedForest {
            trees,
            n_features,
            normalizer,
            offset,
        });
        Ok(())
    }

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<Outlier>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|d| if d < 0.0 { Outlier::Outlier } else { Outlier::Inlier })
            .collect())
    }

    fn decision_function(&self, x: &[FeatureVector]) -> Result<Vec<f64>> {
        let offset = self.fitted()?.offset;
        Ok(self
            .score_samples(x)?
            .into_iter()
            .map(|s| s - offset)
            .collect())
    }

    fn name(&self) -> &str {
        "IsolationForest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tight cluster around 0.5 plus a few far points.
    fn cluster_with_outliers() -> Vec<FeatureVector> {
        let mut x = Vec::new();
        for i in 0..95 {
            let a = (i % 10) as f64 / 100.0;
            let b = (i / 10) as f64 / 100.0;
            x.push(vec![0.5 + a, 0.5 - b]);
        }
        for i in 0..5 {
            x.push(vec![5.0 + i as f64, -5.0 - i as f64]);
        }
        x
    }

    fn small_config() -> IsolationForestConfig {
        IsolationForestConfig {
            n_estimators: 50,
            ..IsolationForestConfig::default()
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.244_770_920_8).abs() < 1e-6, "{c256}");
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_outliers_get_lower_scores() {
        let x = cluster_with_outliers();
        let mut forest = IsolationForest::new(small_config(), 0.05, 2);
        forest.fit(&x).unwrap();

        let decision = forest.decision_function(&x).unwrap();
        let worst_inlier = decision[..95].iter().cloned().fold(f64::INFINITY, f64::min);
        let best_outlier = decision[95..]
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(best_outlier < worst_inlier);

        let predicted = forest.predict(&x).unwrap();
        assert!(predicted[95..].iter().all(|p| *p == Outlier::Outlier));
    }

    #[test]
    fn test_contamination_sets_outlier_share() {
        let x = cluster_with_outliers();
        let mut forest = IsolationForest::new(small_config(), 0.2, 1);
        forest.fit(&x).unwrap();

        let outliers = forest
            .predict(&x)
            .unwrap()
            .into_iter()
            .filter(|p| *p == Outlier::Outlier)
            .count();
        assert!((15..=25).contains(&outliers), "{outliers} outliers");
    }

    #[test]
    fn test_scores_in_range_and_thread_independent() {
        let x = cluster_with_outliers();
        let mut a = IsolationForest::new(small_config(), 0.1, 1);
        let mut b = IsolationForest::new(small_config(), 0.1, 3);
        a.fit(&x).unwrap();
        b.fit(&x).unwrap();

        let scores = a.score_samples(&x).unwrap();
        assert!(scores.iter().all(|s| (-1.0..0.0).contains(s)));
        assert_eq!(scores, b.score_samples(&x).unwrap());
    }

    #[test]
    fn test_scoring_pool_size_does_not_change_scores() {
        let x = cluster_with_outliers();
        let mut forest = IsolationForest::new(small_config(), 0.1, 1);
        forest.fit(&x).unwrap();
        let sequential = forest.score_samples(&x).unwrap();

        forest.n_jobs = 4;
        assert_eq!(forest.score_samples(&x).unwrap(), sequential);
        assert_eq!(
            forest.decision_function(&x).unwrap().len(),
            sequential.len()
        );
    }

    #[test]
    fn test_contamination_parsing_and_resolution() {
        assert_eq!(
            "0.1".parse::<Contamination>().unwrap(),
            Contamination::Fixed(0.1)
        );
        assert_eq!(
            "prevalence".parse::<Contamination>().unwrap(),
            Contamination::TrainPrevalence
        );
        assert!("lots".parse::<Contamination>().is_err());

        assert_eq!(Contamination::Fixed(0.2).resolve(0.9).unwrap(), 0.2);
        assert!(Contamination::Fixed(0.0).resolve(0.1).is_err());
        assert_eq!(Contamination::TrainPrevalence.resolve(0.3).unwrap(), 0.3);
        assert_eq!(Contamination::TrainPrevalence.resolve(0.9).unwrap(), 0.5);
        assert_eq!(Contamination::TrainPrevalence.resolve(0.0).unwrap(), 1e-3);
    }

    #[test]
    fn test_unfitted_errors() {
        let forest = IsolationForest::new(small_config(), 0.1, 1);
        assert!(forest.decision_function(&[vec![0.0]]).is_err());
    }
}
