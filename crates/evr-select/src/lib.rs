//! `evr-select`: turning a candidate pool into one route.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                        |
//! |---------------|-----------------------------------------------------------------|
//! | [`weights`]   | `ObjectiveWeights`                                              |
//! | [`profile`]   | `DriverProfile`, `ProfileConfig`, `ProfileTable`                |
//! | [`selector`]  | `MultiObjectiveSelector` (weighted-sum and Pareto rules)        |
//! | [`policy`]    | `ChargingPolicy` post-selection stage                           |
//! | [`optimizer`] | `RouteOptimizer`, `RoutingModel`, `SelectionPolicy`, comparison |
//! | [`error`]     | `SelectError`, `SelectResult<T>`                                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                      |
//! |---------|-------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to weights, profiles, models |

pub mod error;
pub mod optimizer;
pub mod policy;
pub mod profile;
pub mod selector;
pub mod weights;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{SelectError, SelectResult};
pub use optimizer::{RouteComparison, RouteOptimizer, RouteRequest, RoutingModel, SelectionPolicy};
pub use policy::ChargingPolicy;
pub use profile::{DriverProfile, ProfileConfig, ProfileTable};
pub use selector::MultiObjectiveSelector;
pub use weights::ObjectiveWeights;
