//! `evr-core`: foundational types for the `evroute` battery-aware router.
//!
//! This crate is a dependency of every other `evr-*` crate.  It has no
//! `evr-*` dependencies and only `thiserror` plus optional `serde`.
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `EdgeId`, `StationId`                       |
//! | [`geo`]         | `GeoPoint`, haversine distance                        |
//! | [`battery`]     | `BatteryState`                                        |
//! | [`route`]       | `RouteCandidate`, `ChargingStop`, `PowerClass`        |
//! | [`config`]      | `SolverConfig` (energy and charging constants)        |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod battery;
pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod route;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use battery::BatteryState;
pub use config::SolverConfig;
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{EdgeId, NodeId, StationId};
pub use route::{ChargingStop, PowerClass, RouteCandidate};
