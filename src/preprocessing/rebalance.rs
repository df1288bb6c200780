//! Training-time minority-class oversampling

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::PipelineError;

/// Random oversampling of the minority class over the encoded training
/// matrix. The outcome label is heavily skewed (roughly 89% success in the
/// source corpus); duplicating minority rows with replacement evens the
/// training distribution without touching the held-out split.
#[derive(Debug, Clone)]
pub struct RandomOversampler {
    /// Desired minority/majority ratio after resampling. 1.0 means 50:50.
    pub target_ratio: f64,
    pub seed: u64,
}

impl Default for RandomOversampler {
    fn default() -> Self {
        Self {
            target_ratio: 1.0,
            seed: 42,
        }
    }
}

impl RandomOversampler {
    pub fn rebalance(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Array2<f64>, Array1<f64>), PipelineError> {
        if X.nrows() == 0 || X.nrows() != y.len() {
            return Err(PipelineError::EmptyDataset);
        }

        let positive: Vec<usize> = (0..y.len()).filter(|&i| y[i] >= 0.5).collect();
        let negative: Vec<usize> = (0..y.len()).filter(|&i| y[i] < 0.5).collect();
        if positive.is_empty() || negative.is_empty() {
            // single-class training data, nothing to rebalance
            return Ok((X.clone(), y.clone()));
        }

        let (minority, majority) = if positive.len() < negative.len() {
            (positive, negative)
        } else {
            (negative, positive)
        };

        let desired = ((majority.len() as f64) * self.target_ratio).round() as usize;
        if minority.len() >= desired {
            return Ok((X.clone(), y.clone()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut indices: Vec<usize> = (0..X.nrows()).collect();
        for _ in 0..(desired - minority.len()) {
            indices.push(minority[rng.gen_range(0..minority.len())]);
        }
        indices.shuffle(&mut rng);

        let mut X_out = Array2::zeros((indices.len(), X.ncols()));
        let mut y_out = Array1::zeros(indices.len());
        for (out, &i) in indices.iter().enumerate() {
            X_out
                .index_axis_mut(Axis(0), out)
                .assign(&X.index_axis(Axis(0), i));
            y_out[out] = y[i];
        }
        Ok((X_out, y_out))
    }
}
