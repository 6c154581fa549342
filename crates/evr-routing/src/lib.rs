//! `evr-routing`: battery-aware path search and candidate generation.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                 |
//! |----------------|----------------------------------------------------------|
//! | [`solver`]     | `PathSolver` trait, `BatterySearch`, `SearchMode`        |
//! | [`candidates`] | `CandidateGenerator` (mode and initial-charge sweeps)    |
//! | [`error`]      | `RoutingError`, `RoutingResult<T>`                       |

pub mod candidates;
pub mod error;
pub mod solver;


pub use candidates::CandidateGenerator;
pub use error::{RoutingError, RoutingResult};
pub use solver::{BatterySearch, PathSolver, SearchMode};
