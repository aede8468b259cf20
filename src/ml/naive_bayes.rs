//! Multinomial naive Bayes.

use serde::{Deserialize, Serialize};

use crate::dataset::record::Label;
use crate::error::{Result, SpamSieveError};
use crate::feature::FeatureVector;
use crate::ml::classifier::{Classifier, check_dimension, check_training_set, class_counts, not_fitted};

/// Naive Bayes hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveBayesConfig {
    /// Additive (Laplace/Lidstone) smoothing.
    pub alpha: f64,
}

impl Default for NaiveBayesConfig {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

#[derive(Debug, Clone)]
struct FittedParams {
    /// Log prior per class; `-inf` for a class absent from training.
    class_log_prior: [f64; 2],
    /// Log probability of each feature given the class.
    feature_log_prob: [Vec<f64>; 2],
}

/// Multinomial naive Bayes over non-negative feature weights.
#[derive(Debug, Clone)]
pub struct MultinomialNaiveBayes {
    config: NaiveBayesConfig,
    params: Option<FittedParams>,
}

impl MultinomialNaiveBayes {
    /// Create an unfitted model.
    pub fn new(config: NaiveBayesConfig) -> Self {
        Self {
            config,
            params: None,
        }
    }

    fn params(&self) -> Result<&FittedParams> {
        self.params.as_ref().ok_or_else(|| not_fitted(self.name()))
    }

    /// Joint log likelihood `log P(c) + sum_j x_j log P(j | c)` per class.
    fn joint_log_likelihood(&self, x: &[FeatureVector]) -> Result<Vec<[f64; 2]>> {
        let params = self.params()?;
        check_dimension(x, params.feature_log_prob[0].len())?;

        Ok(x.iter()
            .map(|row| {
                let mut jll = params.class_log_prior;
                for (class, value) in jll.iter_mut().enumerate() {
                    if value.is_finite() {
                        *value += row
                            .iter()
                            .zip(&params.feature_log_prob[class])
                            .filter(|(x, _)| **x != 0.0)
                            .map(|(x, lp)| x * lp)
                            .sum::<f64>();
                    }
                }
                jll
            })
            .collect())
    }
}

impl Default for MultinomialNaiveBayes {
    fn default() -> Self {
        Self::new(NaiveBayesConfig::default())
    }
}

impl Classifier for MultinomialNaiveBayes {
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<()> {
        let n_features = check_training_set(x, y)?;
        if x.iter().flatten().any(|v| *v < 0.0) {
            return Err(SpamSieveError::model(
                "multinomial naive Bayes requires non-negative features",
            ));
        }

        let counts = class_counts(y);
        let mut feature_count = [vec![0.0; n_features], vec![0.0; n_features]];
        for (row, label) in x.iter().zip(y) {
            for (total, value) in feature_count[label.index()].iter_mut().zip(row) {
                *total += value;
            }
        }

        let alpha = self.config.alpha;
        let n_samples = y.len() as f64;
        let class_log_prior = counts.map(|count| {
            if count == 0 {
                f64::NEG_INFINITY
            } else {
                (count as f64 / n_samples).ln()
            }
        });
        let feature_log_prob = feature_count.map(|totals| {
            let denominator = totals.iter().sum::<f64>() + alpha * n_features as f64;
            totals
                .iter()
                .map(|total| ((total + alpha) / denominator).ln())
                .collect::<Vec<_>>()
        });

        self.params = Some(FittedParams {
            class_log_prior,
            feature_log_prob,
        });
        Ok(())
    }

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<Label>> {
        Ok(self
            .joint_log_likelihood(x)?
            .into_iter()
            .map(|[ham, spam]| if spam > ham { Label::Spam } else { Label::Ham })
            .collect())
    }

    fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<f64>> {
        Ok(self
            .joint_log_likelihood(x)?
            .into_iter()
            .map(|[ham, spam]| {
                // Softmax over two classes, shifted by the max for stability.
                let max = ham.max(spam);
                let ham = (ham - max).exp();
                let spam = (spam - max).exp();
                spam / (ham + spam)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "MultinomialNaiveBayes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<FeatureVector>, Vec<Label>) {
        // Column 0 is a "spammy" term, column 1 a "hammy" one.
        let x = vec![
            vec![0.9, 0.1],
            vec![0.8, 0.0],
            vec![0.7, 0.2],
            vec![0.1, 0.9],
            vec![0.0, 0.8],
            vec![0.2, 0.7],
        ];
        let y = vec![
            Label::Spam,
            Label::Spam,
            Label::Spam,
            Label::Ham,
            Label::Ham,
            Label::Ham,
        ];
        (x, y)
    }

    #[test]
    fn test_separates_toy_data() {
        let (x, y) = toy_data();
        let mut model = MultinomialNaiveBayes::default();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!(proba[0] > 0.5);
        assert!(proba[1] < 0.5);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_zero_vector_follows_prior() {
        let x = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]];
        let y = vec![Label::Spam, Label::Ham, Label::Ham];
        let mut model = MultinomialNaiveBayes::default();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&[vec![0.0, 0.0]]).unwrap();
        assert!((proba[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(model.predict(&[vec![0.0, 0.0]]).unwrap(), vec![Label::Ham]);
    }

    #[test]
    fn test_single_class_training() {
        let x = vec![vec![1.0, 0.0], vec![0.5, 0.5]];
        let mut model = MultinomialNaiveBayes::default();
        model.fit(&x, &[Label::Ham, Label::Ham]).unwrap();

        assert_eq!(model.predict_proba(&x).unwrap(), vec![0.0, 0.0]);
        assert_eq!(model.predict(&x).unwrap(), vec![Label::Ham, Label::Ham]);
    }

    #[test]
    fn test_errors() {
        let model = MultinomialNaiveBayes::default();
        assert!(model.predict(&[vec![1.0]]).is_err());

        let mut model = MultinomialNaiveBayes::default();
        assert!(model.fit(&[vec![-1.0]], &[Label::Ham]).is_err());

        let (x, y) = toy_data();
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&[vec![1.0, 0.0, 0.0]]).is_err());
    }
}
