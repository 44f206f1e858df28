use thiserror::Error;

#[derive(Debug, Error)]
pub enum RnnError {
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("ragged matrix: row {row} has {actual} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("sequence has no time steps")]
    EmptySequence,

    #[error("got {examples} examples but {labels} labels")]
    DatasetMismatch { examples: usize, labels: usize },

    #[error("cannot build an objective over an empty dataset")]
    EmptyObjective,

    #[error("parameter vector has {actual} values, network has {expected}")]
    ParameterCount { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RnnError>;
