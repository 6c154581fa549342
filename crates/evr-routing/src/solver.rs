//! Battery-constrained shortest-path search with charging insertion.
//!
//! # State space
//!
//! Each frontier entry is a label `(distance, place, battery)` where a place
//! is either a graph node or a charging station.  From a popped label:
//!
//! - every incident road is a transition if the battery covers
//!   `weight × energy_per_km`;
//! - when the battery is below `low_battery_kwh`, every station within
//!   `station_radius_km` of the node is a detour transition that adds the
//!   great-circle distance to the station and `charge_increment_kwh` of
//!   charge (capped at capacity).
//!
//! A station that shares an id with a graph node continues from that node.
//! Any other station re-enters the node the detour left from, and that node
//! appears a second time in the route.
//!
//! # Visited set
//!
//! A place is closed the first time it is popped and is never expanded
//! again.  Closing is keyed by place only, not by `(place, battery)`, so a
//! shorter low-charge arrival can block a later high-charge arrival that
//! would have been needed further on, and the search then reports
//! `NoRouteFound` for a trip that a `(place, battery)` key would solve.
//! Callers rely on this behaviour.
//!
//! # Ordering
//!
//! [`SearchMode::Uninformed`] orders by accumulated distance.
//! [`SearchMode::Heuristic`] adds the great-circle distance to the
//! destination.  The heuristic is not guaranteed admissible against road
//! weights.  Ties break by place name, then insertion order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use log::debug;
use rustc_hash::FxHashSet;

use evr_core::{
    BatteryState, ChargingStop, GeoPoint, NodeId, RouteCandidate, SolverConfig, StationId,
};
use evr_network::RoadGraph;

use crate::{RoutingError, RoutingResult};

// ── SearchMode ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Min-first on accumulated distance (Dijkstra ordering).
    Uninformed,
    /// Min-first on accumulated distance plus straight-line distance to the
    /// destination (A* ordering).
    Heuristic,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMode::Uninformed => "dijkstra",
            SearchMode::Heuristic  => "astar",
        })
    }
}

// ── PathSolver trait ──────────────────────────────────────────────────────────

/// Pluggable battery-aware path search.
///
/// Implementations must be `Send + Sync` so one solver can be shared by
/// every job a worker runs.
pub trait PathSolver: Send + Sync {
    /// Find a route from `origin` to `destination` starting with
    /// `initial_charge_kwh` of a `capacity_kwh` battery.
    ///
    /// Fails with [`RoutingError::InvalidEndpoint`] if either endpoint is not
    /// a graph node and with [`RoutingError::NoRouteFound`] if the frontier
    /// empties first.  `origin == destination` yields a single-waypoint route
    /// with zero totals.
    fn solve(
        &self,
        graph:              &RoadGraph,
        origin:             &str,
        destination:        &str,
        capacity_kwh:       f64,
        initial_charge_kwh: f64,
        mode:               SearchMode,
    ) -> RoutingResult<RouteCandidate>;

    /// The constants this solver aggregates route metrics with.
    fn config(&self) -> &SolverConfig;
}

// ── BatterySearch ─────────────────────────────────────────────────────────────

/// Default [`PathSolver`]: best-first search over battery-annotated labels.
#[derive(Clone, Debug, Default)]
pub struct BatterySearch {
    pub config: SolverConfig,
}

impl BatterySearch {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl PathSolver for BatterySearch {
    fn solve(
        &self,
        graph:              &RoadGraph,
        origin:             &str,
        destination:        &str,
        capacity_kwh:       f64,
        initial_charge_kwh: f64,
        mode:               SearchMode,
    ) -> RoutingResult<RouteCandidate> {
        let from = graph
            .node_id(origin)
            .ok_or_else(|| RoutingError::InvalidEndpoint(origin.to_string()))?;
        let to = graph
            .node_id(destination)
            .ok_or_else(|| RoutingError::InvalidEndpoint(destination.to_string()))?;
        let battery = BatteryState::new(capacity_kwh, initial_charge_kwh)?;

        Search::new(graph, &self.config, to, mode)
            .run(from, battery)
            .ok_or_else(|| RoutingError::NoRouteFound {
                from: origin.to_string(),
                to:   destination.to_string(),
            })
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }
}

// ── Search internals ──────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Place {
    Node(NodeId),
    Station(StationId),
}

/// One search label.  Labels live in an arena and point at their parent, so
/// the frontier only carries indices.
struct Label {
    place:       Place,
    parent:      Option<usize>,
    /// Node whose roads are expanded from this label.
    host:        NodeId,
    /// Set when this label was reached by leaving a station detour through
    /// `host` of the station label; that node is re-entered in the route.
    reentered:   Option<NodeId>,
    distance_km: f64,
    battery:     BatteryState,
}

/// Frontier entry.  `Ord` is reversed so `BinaryHeap` pops the minimum.
struct Frontier<'g> {
    key:   f64,
    name:  &'g str,
    seq:   usize,
    label: usize,
}

impl PartialEq for Frontier<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier<'_> {}

impl PartialOrd for Frontier<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.name.cmp(self.name))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Search<'g> {
    graph:       &'g RoadGraph,
    config:      &'g SolverConfig,
    destination: NodeId,
    target:      GeoPoint,
    mode:        SearchMode,
    labels:      Vec<Label>,
    heap:        BinaryHeap<Frontier<'g>>,
    visited:     FxHashSet<Place>,
}

impl<'g> Search<'g> {
    fn new(graph: &'g RoadGraph, config: &'g SolverConfig, destination: NodeId, mode: SearchMode) -> Self {
        Self {
            graph,
            config,
            destination,
            target: graph.pos(destination),
            mode,
            labels: Vec::new(),
            heap: BinaryHeap::new(),
            visited: FxHashSet::default(),
        }
    }

    fn run(mut self, origin: NodeId, battery: BatteryState) -> Option<RouteCandidate> {
        let graph = self.graph;
        self.push(Label {
            place:       Place::Node(origin),
            parent:      None,
            host:        origin,
            reentered:   None,
            distance_km: 0.0,
            battery,
        });

        while let Some(Frontier { label: idx, .. }) = self.heap.pop() {
            let label = &self.labels[idx];
            let (place, host, distance, battery) =
                (label.place, label.host, label.distance_km, label.battery);

            if self.arrives(place) {
                debug!(
                    "{} search reached {} after {} labels",
                    self.mode,
                    graph.name(self.destination),
                    self.labels.len(),
                );
                return Some(self.finalize(idx));
            }

            if !self.visited.insert(place) {
                continue;
            }

            if let Place::Node(node) = place {
                if battery.is_below(self.config.low_battery_kwh) {
                    self.scan_stations(idx, node, distance, battery);
                }
            }

            let reentered = match place {
                Place::Station(s) if graph.station_node(s) != Some(host) => Some(host),
                _ => None,
            };
            for edge in graph.out_edges(host) {
                let neighbor = graph.edge_target(edge);
                if self.visited.contains(&Place::Node(neighbor)) {
                    continue;
                }
                let weight = graph.edge_weight(edge);
                let Some(remaining) = battery.drain(self.config.energy_for(weight)) else {
                    continue;
                };
                self.push(Label {
                    place:       Place::Node(neighbor),
                    parent:      Some(idx),
                    host:        neighbor,
                    reentered,
                    distance_km: distance + weight,
                    battery:     remaining,
                });
            }
        }

        debug!(
            "{} search exhausted the frontier after {} labels",
            self.mode,
            self.labels.len(),
        );
        None
    }

    /// Push a detour label for every unvisited station near `node`.
    fn scan_stations(&mut self, parent: usize, node: NodeId, distance: f64, battery: BatteryState) {
        let nearby = self
            .graph
            .stations()
            .within(self.graph.pos(node), self.config.station_radius_km);
        for (station, detour_km) in nearby {
            if self.visited.contains(&Place::Station(station)) {
                continue;
            }
            self.push(Label {
                place:       Place::Station(station),
                parent:      Some(parent),
                host:        self.graph.station_node(station).unwrap_or(node),
                reentered:   None,
                distance_km: distance + detour_km,
                battery:     battery.charge(self.config.charge_increment_kwh),
            });
        }
    }

    fn arrives(&self, place: Place) -> bool {
        match place {
            Place::Node(n) => n == self.destination,
            Place::Station(s) => self.graph.station_node(s) == Some(self.destination),
        }
    }

    fn push(&mut self, label: Label) {
        let idx = self.labels.len();
        let key = match self.mode {
            SearchMode::Uninformed => label.distance_km,
            SearchMode::Heuristic => label.distance_km + self.position(label.place).distance_km(self.target),
        };
        let name = self.name(label.place);
        self.labels.push(label);
        self.heap.push(Frontier { key, name, seq: idx, label: idx });
    }

    fn name(&self, place: Place) -> &'g str {
        let graph = self.graph;
        match place {
            Place::Node(n) => graph.name(n),
            Place::Station(s) => graph.stations().get(s).id.as_str(),
        }
    }

    fn position(&self, place: Place) -> GeoPoint {
        match place {
            Place::Node(n) => self.graph.pos(n),
            Place::Station(s) => self.graph.stations().get(s).location(),
        }
    }

    /// Walk parent pointers back from `last` and aggregate the route.
    fn finalize(&self, last: usize) -> RouteCandidate {
        let mut sequence        = Vec::new();
        let mut coordinates     = Vec::new();
        let mut battery_profile = Vec::new();
        let mut stations        = Vec::new();

        let mut cursor = Some(last);
        while let Some(idx) = cursor {
            let label = &self.labels[idx];
            sequence.push(self.name(label.place).to_string());
            coordinates.push(self.position(label.place));
            battery_profile.push(label.battery.remaining_kwh);
            if let Place::Station(s) = label.place {
                stations.push(s);
            }
            if let (Some(node), Some(parent)) = (label.reentered, label.parent) {
                sequence.push(self.graph.name(node).to_string());
                coordinates.push(self.graph.pos(node));
                battery_profile.push(self.labels[parent].battery.remaining_kwh);
            }
            cursor = label.parent;
        }
        sequence.reverse();
        coordinates.reverse();
        battery_profile.reverse();
        stations.reverse();

        let charging_stops = stations
            .into_iter()
            .map(|s| {
                let st = self.graph.stations().get(s);
                ChargingStop {
                    station_id:  st.id.clone(),
                    location:    st.location(),
                    power_kw:    st.power_kw,
                    power_class: st.power_class,
                }
            })
            .collect();

        let distance_km = self.labels[last].distance_km;
        let energy_kwh  = self.config.energy_for(distance_km);
        RouteCandidate {
            sequence,
            coordinates,
            battery_profile,
            distance_km,
            time_min: self.config.time_for(distance_km),
            energy_kwh,
            emissions_g: self.config.emissions_for(energy_kwh),
            charging_stops,
        }
    }
}
