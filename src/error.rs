//! Error types for the predictor and the trace front-end.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while constructing a predictor.
#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Failed to allocate predictor state: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    #[error("Invalid predictor configuration: {0}")]
    Config(String),
}

/// Errors raised while reading or building a trace.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Trace is missing a configuration header")]
    MissingHeader,

    #[error("Malformed configuration header on line {line}: {msg}")]
    BadHeader { line: usize, msg: String },

    #[error("Malformed branch record on line {line}: {msg}")]
    BadRecord { line: usize, msg: String },

    #[error("Failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Undefined label {0}")]
    UndefinedLabel(usize),

    #[error("Invalid synthetic program: {0}")]
    BadProgram(String),
}

/// Type alias for results produced while handling traces.
pub type TraceResult<T> = Result<T, TraceError>;
