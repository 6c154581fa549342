//! `evr-network`: the graph provider for the routing pipeline.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`data`]    | Serializable `GraphData` records (nodes, edges, stations)   |
//! | [`network`] | `RoadGraph` (CSR over named nodes), `RoadGraphBuilder`      |
//! | [`station`] | `ChargingStation`, `StationRegistry` (R-tree radius query)  |
//! | [`region`]  | `RegionSource` trait, `BuiltinRegions`                      |
//! | [`loader`]  | `CsvRegionSource`, `load_graph_dir`                         |
//! | [`cache`]   | `GraphCache` (memory + on-disk JSON, per-region lock)       |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                          |

pub mod cache;
pub mod data;
pub mod error;
pub mod loader;
pub mod network;
pub mod region;
pub mod station;


pub use cache::GraphCache;
pub use data::{EdgeRecord, GraphData, NodeRecord};
pub use error::{NetworkError, NetworkResult};
pub use loader::{CsvRegionSource, load_graph_dir};
pub use network::{RoadGraph, RoadGraphBuilder};
pub use region::{BuiltinRegions, RegionSource};
pub use station::{ChargingStation, StationRegistry};
