//! CART classification tree (Gini impurity).
//!
//! The tree builder is shared with [`crate::ml::random_forest`]: a forest is a
//! set of [`CartTree`]s grown on bootstrap samples with per-node feature
//! subsampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::dataset::record::Label;
use crate::error::Result;
use crate::feature::FeatureVector;
use crate::ml::classifier::{Classifier, check_dimension, check_training_set, not_fitted};

/// Values closer than this are treated as equal when placing thresholds.
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Number of candidate features examined at each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Every feature.
    All,
    /// `floor(sqrt(n_features))`.
    Sqrt,
    /// `floor(log2(n_features))`.
    Log2,
    /// A fixed number of features.
    Count(usize),
}

impl MaxFeatures {
    /// Resolve against the number of features, always at least 1.
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::Count(k) => k.min(n_features),
        };
        k.max(1)
    }
}

/// Decision tree hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTreeConfig {
    /// Maximum depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Minimum samples required in each child.
    pub min_samples_leaf: usize,
    /// Candidate features per node.
    pub max_features: MaxFeatures,
    /// Seed of the feature permutation.
    pub seed: u64,
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(20),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            seed: 42,
        }
    }
}

/// Feature-major copy of a training matrix.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMatrix {
    columns: Vec<Vec<f64>>,
}

impl ColumnMatrix {
    /// Transpose row vectors of equal length.
    pub(crate) fn from_rows(x: &[FeatureVector], n_features: usize) -> Self {
        let mut columns = vec![Vec::with_capacity(x.len()); n_features];
        for row in x {
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(*value);
            }
        }
        Self { columns }
    }

    pub(crate) fn n_features(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, feature: usize) -> &[f64] {
        &self.columns[feature]
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        spam_probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// A fitted classification tree.
#[derive(Debug, Clone)]
pub(crate) struct CartTree {
    root: TreeNode,
    n_features: usize,
}

impl CartTree {
    /// Grow a tree on the samples listed in `indices` (duplicates allowed).
    pub(crate) fn fit(
        columns: &ColumnMatrix,
        y: &[Label],
        indices: &mut [usize],
        config: &DecisionTreeConfig,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = columns.n_features();
        let mut builder = TreeBuilder {
            columns,
            y,
            config,
            max_features: config.max_features.resolve(n_features),
            features: (0..n_features).collect(),
            buffer: Vec::with_capacity(indices.len()),
            rng,
        };
        let root = builder.build(indices, 0);
        Self { root, n_features }
    }

    /// Fraction of spam in the leaf reached by `row`.
    pub(crate) fn spam_probability(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { spam_probability } => return *spam_probability,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Dimension the tree was fitted on.
    pub(crate) fn n_features(&self) -> usize {
        self.n_features
    }

    /// Length of the longest root-to-leaf path.
    pub(crate) fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }

    /// Number of leaves.
    pub(crate) fn n_leaves(&self) -> usize {
        fn leaves_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves_of(left) + leaves_of(right),
            }
        }
        leaves_of(&self.root)
    }
}

struct TreeBuilder<'a> {
    columns: &'a ColumnMatrix,
    y: &'a [Label],
    config: &'a DecisionTreeConfig,
    max_features: usize,
    /// Feature permutation, reshuffled lazily at each node.
    features: Vec<usize>,
    /// Scratch space of `(value, class index)` pairs.
    buffer: Vec<(f64, usize)>,
    rng: &'a mut StdRng,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> TreeNode {
        let counts = self.counts(indices);
        let n = indices.len();
        let leaf = TreeNode::Leaf {
            spam_probability: if n == 0 {
                0.0
            } else {
                counts[1] as f64 / n as f64
            },
        };

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        let is_pure = counts[0] == 0 || counts[1] == 0;
        if depth_reached
            || is_pure
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
        {
            return leaf;
        }

        let Some(split) = self.find_best_split(indices) else {
            return leaf;
        };

        let columns = self.columns;
        let column = columns.column(split.feature);
        let mut n_left = 0;
        for i in 0..n {
            if column[indices[i]] <= split.threshold {
                indices.swap(n_left, i);
                n_left += 1;
            }
        }
        if n_left == 0 || n_left == n {
            return leaf;
        }

        let (left, right) = indices.split_at_mut(n_left);
        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    fn counts(&self, indices: &[usize]) -> [usize; 2] {
        let mut counts = [0; 2];
        for &i in indices {
            counts[self.y[i].index()] += 1;
        }
        counts
    }

    /// Examine features in random order until `max_features` non-constant
    /// ones have been scored; keep the split with the lowest weighted Gini.
    fn find_best_split(&mut self, indices: &[usize]) -> Option<SplitCandidate> {
        let (columns, y) = (self.columns, self.y);
        let n_features = self.features.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let n = indices.len();
        let mut visited = 0;
        let mut best: Option<SplitCandidate> = None;

        for i in 0..n_features {
            if visited >= self.max_features {
                break;
            }
            let j = self.rng.random_range(i..n_features);
            self.features.swap(i, j);
            let feature = self.features[i];

            let column = columns.column(feature);
            self.buffer.clear();
            self.buffer
                .extend(indices.iter().map(|&s| (column[s], y[s].index())));

            let (min, max) = self
                .buffer
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (v, _)| {
                    (lo.min(*v), hi.max(*v))
                });
            if max <= min + FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            self.buffer.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut total = [0usize; 2];
            for (_, class) in &self.buffer {
                total[*class] += 1;
            }
            let mut left = [0usize; 2];
            for pos in 0..n - 1 {
                left[self.buffer[pos].1] += 1;
                let (value, next) = (self.buffer[pos].0, self.buffer[pos + 1].0);
                if next <= value + FEATURE_THRESHOLD {
                    continue;
                }
                let n_left = pos + 1;
                if n_left < min_leaf || n - n_left < min_leaf {
                    continue;
                }
                let right = [total[0] - left[0], total[1] - left[1]];
                let impurity = n_left as f64 * gini(left, n_left)
                    + (n - n_left) as f64 * gini(right, n - n_left);

                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    let mut threshold = value / 2.0 + next / 2.0;
                    if threshold == next || !threshold.is_finite() {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: [usize; 2], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let p0 = counts[0] as f64 / n;
    let p1 = counts[1] as f64 / n;
    1.0 - p0 * p0 - p1 * p1
}

/// A single CART tree classifier.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    config: DecisionTreeConfig,
    tree: Option<CartTree>,
}

impl DecisionTreeClassifier {
    /// Create an unfitted tree.
    pub fn new(config: DecisionTreeConfig) -> Self {
        Self { config, tree: None }
    }

    /// Depth of the fitted tree.
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(CartTree::depth)
    }

    /// Leaf count of the fitted tree.
    pub fn n_leaves(&self) -> Option<usize> {
        self.tree.as_ref().map(CartTree::n_leaves)
    }

    fn tree(&self) -> Result<&CartTree> {
        self.tree.as_ref().ok_or_else(|| not_fitted(self.name()))
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(DecisionTreeConfig::default())
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<()> {
        let n_features = check_training_set(x, y)?;
        let columns = ColumnMatrix::from_rows(x, n_features);
        let mut indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        self.tree = Some(CartTree::fit(
            &columns,
            y,
            &mut indices,
            &self.config,
            &mut rng,
        ));
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
        let tree = self.tree()?;
        check_dimension(x, tree.n_features())?;
        Ok(x.iter().map(|row| tree.spam_probability(row)).collect())
    }

    fn name(&self) -> &str {
        "DecisionTreeClassifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spam iff feature 1 > 0.5; feature 0 is noise.
    fn threshold_data() -> (Vec<FeatureVector>, Vec<Label>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let signal = i as f64 / 40.0;
            let noise = ((i * 7) % 11) as f64 / 11.0;
            x.push(vec![noise, signal]);
            y.push(if signal > 0.5 { Label::Spam } else { Label::Ham });
        }
        (x, y)
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::All.resolve(3000), 3000);
        assert_eq!(MaxFeatures::Sqrt.resolve(3000), 54);
        assert_eq!(MaxFeatures::Log2.resolve(1024), 10);
        assert_eq!(MaxFeatures::Count(5).resolve(3), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
    }

    #[test]
    fn test_learns_single_threshold() {
        let (x, y) = threshold_data();
        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.depth(), Some(1));
        assert_eq!(tree.n_leaves(), Some(2));
        assert_eq!(
            tree.predict(&[vec![0.0, 0.9], vec![0.9, 0.1]]).unwrap(),
            vec![Label::Spam, Label::Ham]
        );
    }

    #[test]
    fn test_max_depth_limits_growth() {
        // XOR needs depth 2.
        let x = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let y = vec![Label::Ham, Label::Spam, Label::Spam, Label::Ham];

        let mut deep = DecisionTreeClassifier::default();
        deep.fit(&x, &y).unwrap();
        assert_eq!(deep.predict(&x).unwrap(), y);

        let mut stump = DecisionTreeClassifier::new(DecisionTreeConfig {
            max_depth: Some(0),
            ..DecisionTreeConfig::default()
        });
        stump.fit(&x, &y).unwrap();
        assert_eq!(stump.depth(), Some(0));
        assert_eq!(stump.predict_proba(&x).unwrap(), vec![0.5; 4]);
    }

    #[test]
    fn test_constant_features_give_leaf() {
        let x = vec![vec![1.0, 0.0]; 4];
        let y = vec![Label::Ham, Label::Spam, Label::Spam, Label::Spam];
        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.n_leaves(), Some(1));
        assert_eq!(tree.predict(&x[..1]).unwrap(), vec![Label::Spam]);
        assert!((tree.predict_proba(&x[..1]).unwrap()[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = threshold_data();
        let config = DecisionTreeConfig {
            max_features: MaxFeatures::Count(1),
            ..DecisionTreeConfig::default()
        };
        let mut a = DecisionTreeClassifier::new(config);
        let mut b = DecisionTreeClassifier::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_unfitted_and_dimension_errors() {
        let tree = DecisionTreeClassifier::default();
        assert!(tree.predict(&[vec![0.0]]).is_err());

        let (x, y) = threshold_data();
        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&x, &y).unwrap();
        assert!(tree.predict(&[vec![0.0]]).is_err());
    }
}
