//! Gradient-boosted decision-tree classifier

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Boosting hyperparameters. Defaults are the constants selected by a prior
/// randomized search over the source corpus; all overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Row fraction drawn per boosting round.
    pub subsample: f64,
    /// Column fraction drawn per tree.
    pub colsample_bytree: f64,
    /// Column fraction drawn per split level.
    pub colsample_bylevel: f64,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 10,
            subsample: 0.8,
            colsample_bytree: 0.5,
            colsample_bylevel: 0.8,
            min_samples_split: 10,
            seed: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

fn eval_node(node: &TreeNode, row: &ArrayView1<f64>) -> f64 {
    match node {
        TreeNode::Leaf { value } => *value,
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                eval_node(left, row)
            } else {
                eval_node(right, row)
            }
        }
    }
}

/// Binary classifier boosted with logistic loss: each round fits a regression
/// tree to the residuals of the running margin and adds a damped Newton step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostingParams,
    base_score: f64,
    trees: Vec<TreeNode>,
    trained: bool,
}

impl GradientBoostedTrees {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            trees: Vec::new(),
            trained: false,
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), PipelineError> {
        let n_samples = X.nrows();
        let n_features = X.ncols();
        if n_samples == 0 || n_features == 0 || n_samples != y.len() {
            return Err(PipelineError::EmptyDataset);
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);

        // log-odds prior over the training labels
        let prior = (y.sum() / n_samples as f64).clamp(1e-6, 1.0 - 1e-6);
        self.base_score = (prior / (1.0 - prior)).ln();
        self.trees.clear();

        let mut margins = Array1::from_elem(n_samples, self.base_score);
        let all_features: Vec<usize> = (0..n_features).collect();

        for _ in 0..self.params.n_estimators {
            let mut gradients = Array1::zeros(n_samples);
            let mut hessians = Array1::zeros(n_samples);
            for i in 0..n_samples {
                let p = sigmoid(margins[i]);
                gradients[i] = y[i] - p;
                hessians[i] = (p * (1.0 - p)).max(1e-12);
            }

            let rows: Vec<usize> = (0..n_samples)
                .filter(|_| rng.gen::<f64>() < self.params.subsample)
                .collect();
            let rows = if rows.is_empty() {
                (0..n_samples).collect()
            } else {
                rows
            };

            let tree_features =
                sample_columns(&all_features, self.params.colsample_bytree, &mut rng);

            let tree = self.build_node(X, &gradients, &hessians, rows, &tree_features, 0, &mut rng);

            for i in 0..n_samples {
                margins[i] += self.params.learning_rate * eval_node(&tree, &X.row(i));
            }
            self.trees.push(tree);
        }

        self.trained = true;
        Ok(())
    }

    fn build_node(
        &self,
        X: &Array2<f64>,
        gradients: &Array1<f64>,
        hessians: &Array1<f64>,
        indices: Vec<usize>,
        tree_features: &[usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> TreeNode {
        if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return TreeNode::Leaf {
                value: leaf_value(gradients, hessians, &indices),
            };
        }

        let level_features = sample_columns(tree_features, self.params.colsample_bylevel, rng);

        let mut best: Option<(usize, f64)> = None;
        let mut best_score = f64::INFINITY;

        for &feature in &level_features {
            let mut values: Vec<f64> = indices.iter().map(|&i| X[[i, feature]]).collect();
            values.sort_by(f64::total_cmp);
            values.dedup();
            if values.len() < 2 {
                continue;
            }

            // up to 16 candidate thresholds, midpoints of the sorted values
            let step = (values.len() / 16).max(1);
            for k in (step..values.len()).step_by(step) {
                let threshold = (values[k - 1] + values[k]) / 2.0;

                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| X[[i, feature]] < threshold);
                if left.is_empty() || right.is_empty() {
                    continue;
                }

                let score = residual_sse(gradients, &left) + residual_sse(gradients, &right);
                if score < best_score {
                    best_score = score;
                    best = Some((feature, threshold));
                }
            }
        }

        let Some((feature, threshold)) = best else {
            return TreeNode::Leaf {
                value: leaf_value(gradients, hessians, &indices),
            };
        };

        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| X[[i, feature]] < threshold);

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.build_node(X, gradients, hessians, left, tree_features, depth + 1, rng)),
            right: Box::new(self.build_node(X, gradients, hessians, right, tree_features, depth + 1, rng)),
        }
    }

    pub fn predict_margin(&self, row: &ArrayView1<f64>) -> Result<f64, PipelineError> {
        if !self.trained {
            return Err(PipelineError::NotTrained);
        }
        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += self.params.learning_rate * eval_node(tree, row);
        }
        Ok(margin)
    }

    pub fn predict_proba(&self, row: &ArrayView1<f64>) -> Result<f64, PipelineError> {
        Ok(sigmoid(self.predict_margin(row)?))
    }

    /// Native decision rule: probability threshold at 0.5.
    pub fn predict(&self, row: &ArrayView1<f64>) -> Result<u8, PipelineError> {
        Ok(if self.predict_proba(row)? >= 0.5 { 1 } else { 0 })
    }

    pub fn predict_proba_batch(&self, X: &Array2<f64>) -> Result<Array1<f64>, PipelineError> {
        let mut probs = Array1::zeros(X.nrows());
        for i in 0..X.nrows() {
            probs[i] = self.predict_proba(&X.row(i))?;
        }
        Ok(probs)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Newton leaf value with an L2 term on the hessian sum.
fn leaf_value(gradients: &Array1<f64>, hessians: &Array1<f64>, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let grad_sum: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let hess_sum: f64 = indices.iter().map(|&i| hessians[i]).sum();
    grad_sum / (hess_sum + 1.0)
}

fn residual_sse(gradients: &Array1<f64>, indices: &[usize]) -> f64 {
    let mean: f64 = indices.iter().map(|&i| gradients[i]).sum::<f64>() / indices.len() as f64;
    indices
        .iter()
        .map(|&i| (gradients[i] - mean).powi(2))
        .sum()
}

fn sample_columns(features: &[usize], fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    let keep = ((features.len() as f64) * fraction).round() as usize;
    let keep = keep.clamp(1, features.len());
    let mut sampled: Vec<usize> = features
        .choose_multiple(rng, keep)
        .copied()
        .collect();
    sampled.sort_unstable();
    sampled
}
