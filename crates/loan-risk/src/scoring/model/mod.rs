mod tree;

use serde::{Deserialize, Serialize};

use super::encoder::EncodedFeatures;
use super::error::TrainingError;
use tree::RegressionTree;

const PROBABILITY_FLOOR: f64 = 1e-6;
const HESSIAN_FLOOR: f64 = 1e-16;

/// Boosting hyperparameters for the logistic objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// Minimum loss reduction required to keep a split.
    pub gamma: f64,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 4,
            min_child_weight: 2.0,
            gamma: 0.1,
            lambda: 1.0,
        }
    }
}

impl BoostingParams {
    /// Reject settings that would make leaf weights non-finite or fit no trees at all.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_estimators == 0 {
            return Err(TrainingError::InvalidParams {
                param: "n_estimators",
                value: 0.0,
            });
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainingError::InvalidParams {
                param: "learning_rate",
                value: self.learning_rate,
            });
        }

        let penalties = [
            ("min_child_weight", self.min_child_weight),
            ("gamma", self.gamma),
            ("lambda", self.lambda),
        ];
        for (param, value) in penalties {
            if !(value.is_finite() && value >= 0.0) {
                return Err(TrainingError::InvalidParams { param, value });
            }
        }

        Ok(())
    }
}

/// Gradient-boosted tree ensemble producing calibrated default probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostedClassifier {
    base_margin: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
    feature_gain: Vec<f64>,
}

impl GradientBoostedClassifier {
    /// Fit against binary default labels (`true` = defaulted).
    pub fn fit(
        features: &[EncodedFeatures],
        labels: &[bool],
        params: &BoostingParams,
    ) -> Result<Self, TrainingError> {
        params.validate()?;
        if features.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if features.len() != labels.len() {
            return Err(TrainingError::ShapeMismatch {
                expected: features.len(),
                found: labels.len(),
            });
        }

        let n_features = features[0].len();
        if let Some(row) = features.iter().find(|row| row.len() != n_features) {
            return Err(TrainingError::ShapeMismatch {
                expected: n_features,
                found: row.len(),
            });
        }

        let positives = labels.iter().filter(|&&label| label).count();
        if positives == 0 || positives == labels.len() {
            return Err(TrainingError::SingleClass);
        }

        let positive_rate = (positives as f64 / labels.len() as f64)
            .clamp(PROBABILITY_FLOOR, 1.0 - PROBABILITY_FLOOR);
        let base_margin = (positive_rate / (1.0 - positive_rate)).ln();

        let rows: Vec<&[f64]> = features.iter().map(EncodedFeatures::as_slice).collect();
        let targets: Vec<f64> = labels
            .iter()
            .map(|&label| if label { 1.0 } else { 0.0 })
            .collect();
        let mut margins = vec![base_margin; rows.len()];
        let mut gradients = vec![0.0; rows.len()];
        let mut hessians = vec![0.0; rows.len()];
        let mut feature_gain = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for (index, margin) in margins.iter().enumerate() {
                let probability = sigmoid(*margin);
                gradients[index] = probability - targets[index];
                hessians[index] = (probability * (1.0 - probability)).max(HESSIAN_FLOOR);
            }

            let tree =
                RegressionTree::grow(&rows, &gradients, &hessians, params, &mut feature_gain);
            for (margin, row) in margins.iter_mut().zip(&rows) {
                *margin += tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            base_margin,
            trees,
            n_features,
            feature_gain,
        })
    }

    /// Encoded width the ensemble was trained on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Raw log-odds before the logistic link.
    pub fn margin(&self, features: &EncodedFeatures) -> f64 {
        debug_assert_eq!(features.len(), self.n_features);
        let row = features.as_slice();
        self.base_margin + self.trees.iter().map(|tree| tree.predict(row)).sum::<f64>()
    }

    /// P(default) for one encoded applicant.
    pub fn predict_probability(&self, features: &EncodedFeatures) -> f64 {
        sigmoid(self.margin(features))
    }

    /// Total split gain per encoded feature, normalized to sum to one.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.feature_gain.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.n_features];
        }
        self.feature_gain.iter().map(|gain| gain / total).collect()
    }
}

fn sigmoid(margin: f64) -> f64 {
    if margin >= 0.0 {
        1.0 / (1.0 + (-margin).exp())
    } else {
        let exp = margin.exp();
        exp / (1.0 + exp)
    }
}
