//! Graph-provider error type.

use thiserror::Error;

/// Errors produced by `evr-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("edge references unknown node {0:?}")]
    UnknownNode(String),

    #[error("node {0:?} defined more than once")]
    DuplicateNode(String),

    #[error("charging station {0:?} defined more than once")]
    DuplicateStation(String),

    #[error("edge {from:?}–{to:?} has invalid weight {weight}")]
    InvalidWeight { from: String, to: String, weight: f64 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
