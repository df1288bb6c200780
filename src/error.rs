//! Error types for the pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The raw table does not carry a column the fixed mapping requires.
    /// Fatal at load time: training must never proceed with a reduced
    /// column set.
    #[error("missing required column '{0}' in input data")]
    MissingColumn(String),

    #[error("row {row}: {message}")]
    MalformedRow { row: usize, message: String },

    #[error("invalid field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("empty dataset")]
    EmptyDataset,

    #[error("model not trained")]
    NotTrained,

    /// The classifier emitted a label outside {0, 1}. Internal defect,
    /// surfaced instead of logged and dropped.
    #[error("classifier produced label {0}, expected 0 or 1")]
    InvalidPrediction(i64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
