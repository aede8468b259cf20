//! Reproducible train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpamSieveError};

/// Shuffle-split parameters.
///
/// The test partition holds `ceil(test_size * n)` rows; the assignment only
/// depends on `n`, `test_size` and `seed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainTestSplit {
    /// Fraction of rows assigned to the test partition, in (0, 1).
    pub test_size: f64,
    /// Seed of the shuffle.
    pub seed: u64,
}

impl Default for TrainTestSplit {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Row indices of each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Training rows.
    pub train: Vec<usize>,
    /// Test rows.
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Pick the rows of each partition out of `items`.
    pub fn select<T: Clone>(&self, items: &[T]) -> (Vec<T>, Vec<T>) {
        let pick = |idx: &[usize]| idx.iter().map(|&i| items[i].clone()).collect();
        (pick(&self.train), pick(&self.test))
    }
}

impl TrainTestSplit {
    /// Create a split with the given test fraction and seed.
    pub fn new(test_size: f64, seed: u64) -> Self {
        Self { test_size, seed }
    }

    /// Check the test fraction.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SpamSieveError::split(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        Ok(())
    }

    /// Partition `0..n` into disjoint train and test index sets.
    pub fn split_indices(&self, n: usize) -> Result<SplitIndices> {
        self.validate()?;

        let n_test = (self.test_size * n as f64).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(SpamSieveError::split(format!(
                "cannot split {n} rows with test_size {}: a partition would be empty",
                self.test_size
            )));
        }

        let mut permutation: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        permutation.shuffle(&mut rng);

        let train = permutation.split_off(n_test);
        Ok(SplitIndices {
            train,
            test: permutation,
        })
    }
}
