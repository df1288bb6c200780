//! gtd-ml - attack-outcome prediction pipeline

pub mod dataset;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod types;

pub use error::PipelineError;
pub use models::{BoostingParams, GradientBoostedTrees, LogisticBaseline};
pub use pipeline::TrainedPipeline;
pub use preprocessing::{BinaryEncoder, ImputerState, RandomOversampler};
pub use types::{Outcome, PredictRequest};
