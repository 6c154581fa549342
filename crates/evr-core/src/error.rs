//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid battery state: capacity {capacity} kWh, charge {charge} kWh")]
    InvalidBattery { capacity: f64, charge: f64 },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `evr-core`.
pub type CoreResult<T> = Result<T, CoreError>;
