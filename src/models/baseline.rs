//! Logistic-regression baseline

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.1,
            l2: 1e-4,
        }
    }
}

/// Plain batch-gradient-descent logistic regression. The boosted ensemble was
/// retained after dominating this family on the source corpus; the trainer
/// keeps one cheap baseline so the comparison stays reproducible. Never
/// persisted, so it stays outside the serialized pipeline.
#[derive(Debug, Clone)]
pub struct LogisticBaseline {
    params: BaselineParams,
    weights: Option<Array1<f64>>,
    bias: f64,
}

impl LogisticBaseline {
    pub fn new(params: BaselineParams) -> Self {
        Self {
            params,
            weights: None,
            bias: 0.0,
        }
    }

    pub fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), PipelineError> {
        let n_samples = X.nrows();
        let n_features = X.ncols();
        if n_samples == 0 || n_features == 0 || n_samples != y.len() {
            return Err(PipelineError::EmptyDataset);
        }

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        for _ in 0..self.params.epochs {
            let margins = X.dot(&weights) + bias;
            let probs = margins.mapv(sigmoid);
            let errors = &probs - y;

            let grad_w = X.t().dot(&errors) / n_samples as f64 + self.params.l2 * &weights;
            let grad_b = errors.sum() / n_samples as f64;

            weights = weights - self.params.learning_rate * grad_w;
            bias -= self.params.learning_rate * grad_b;
        }

        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    pub fn predict_proba_batch(&self, X: &Array2<f64>) -> Result<Array1<f64>, PipelineError> {
        let weights = self.weights.as_ref().ok_or(PipelineError::NotTrained)?;
        Ok((X.dot(weights) + self.bias).mapv(sigmoid))
    }
}

impl Default for LogisticBaseline {
    fn default() -> Self {
        Self::new(BaselineParams::default())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_a_linear_rule() {
        let mut X = Array2::zeros((40, 2));
        let mut y = Array1::zeros(40);
        for i in 0..40 {
            let label = (i % 2) as f64;
            X[[i, 0]] = label;
            X[[i, 1]] = ((i / 2) % 3) as f64;
            y[i] = label;
        }

        let mut model = LogisticBaseline::default();
        model.fit(&X, &y).unwrap();
        let probs = model.predict_proba_batch(&X).unwrap();
        for (p, label) in probs.iter().zip(y.iter()) {
            assert_eq!((*p >= 0.5) as i64 as f64, *label);
        }
    }

    #[test]
    fn untrained_baseline_refuses_to_predict() {
        let model = LogisticBaseline::default();
        let X = Array2::zeros((1, 2));
        assert!(matches!(
            model.predict_proba_batch(&X).unwrap_err(),
            PipelineError::NotTrained
        ));
    }
}
