//! Selection error type.

use thiserror::Error;

use evr_routing::RoutingError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectError {
    /// The selector was handed no candidates.
    #[error("cannot select from an empty candidate pool")]
    EmptyPool,

    #[error("objective weight {name} must be finite and nonnegative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("unknown {kind} {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

pub type SelectResult<T> = Result<T, SelectError>;
