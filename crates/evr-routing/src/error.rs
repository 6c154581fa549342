//! Routing error type.

use thiserror::Error;

use evr_core::CoreError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// Origin or destination is not a node of the graph.
    #[error("endpoint {0:?} not found in graph")]
    InvalidEndpoint(String),

    /// The frontier emptied before reaching the destination.
    #[error("no valid route found from {from} to {to}")]
    NoRouteFound { from: String, to: String },

    /// Every candidate attempt failed.
    #[error("no valid route candidates from {from} to {to}")]
    NoCandidates { from: String, to: String },

    #[error(transparent)]
    Battery(#[from] CoreError),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
