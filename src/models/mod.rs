/// Classifiers and evaluation

pub mod baseline;
pub mod boosting;
pub mod metrics;

pub use baseline::LogisticBaseline;
pub use boosting::{BoostingParams, GradientBoostedTrees};
