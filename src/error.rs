use crate::editor::GraphType;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Invalid edit at '{path}': {reason}")]
    InvalidEdit { path: String, reason: String },

    #[error("Invalid color '{color}': {reason}")]
    InvalidColor { color: String, reason: String },

    #[error("Color range must contain at least one color")]
    EmptyColorRange,

    #[error("Threshold scale requires an explicit domain")]
    MissingThresholdDomain,

    #[error("Threshold domain must be ascending, got {0:?}")]
    UnsortedThresholdDomain(Vec<f64>),

    #[error("{0} does not support scale coloring")]
    ScaleNotSupported(GraphType),

    #[error("Y-axis column '{0}' selected more than once")]
    DuplicateColumn(String),

    #[error("Data binding error: {0}")]
    Binding(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
