//! Routing-model dispatch.
//!
//! [`RouteOptimizer`] is the single entry point the pipeline calls to turn a
//! request into a route:
//!
//! - `dijkstra` solves once in [`SearchMode::Uninformed`];
//! - `astar` solves once in [`SearchMode::Heuristic`];
//! - `multi_objective` generates a candidate pool, selects one with the
//!   requested [`SelectionPolicy`] and runs the profile's
//!   [`ChargingPolicy`] over it.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};

use evr_core::RouteCandidate;
use evr_network::RoadGraph;
use evr_routing::{CandidateGenerator, PathSolver, SearchMode};

use crate::{ChargingPolicy, DriverProfile, MultiObjectiveSelector, ProfileTable, SelectError, SelectResult};

// ── RoutingModel ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RoutingModel {
    #[default]
    Dijkstra,
    Astar,
    MultiObjective,
}

impl RoutingModel {
    pub const ALL: [RoutingModel; 3] = [RoutingModel::Dijkstra, RoutingModel::Astar, RoutingModel::MultiObjective];

    pub fn as_str(self) -> &'static str {
        match self {
            RoutingModel::Dijkstra       => "dijkstra",
            RoutingModel::Astar          => "astar",
            RoutingModel::MultiObjective => "multi_objective",
        }
    }

    /// Parse `name`, falling back to [`RoutingModel::Dijkstra`] with a
    /// warning.
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("unknown routing model {name:?}, using dijkstra");
            RoutingModel::Dijkstra
        })
    }
}

impl fmt::Display for RoutingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingModel {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "dijkstra"        => Ok(RoutingModel::Dijkstra),
            "astar" | "a*"    => Ok(RoutingModel::Astar),
            "multi_objective" => Ok(RoutingModel::MultiObjective),
            _ => Err(SelectError::UnknownVariant { kind: "routing model", value: s.to_string() }),
        }
    }
}

// ── SelectionPolicy ───────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SelectionPolicy {
    #[default]
    WeightedSum,
    /// First member of the Pareto front, in pool order.
    Pareto,
}

impl SelectionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionPolicy::WeightedSum => "weighted_sum",
            SelectionPolicy::Pareto      => "pareto",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "weighted_sum" => Ok(SelectionPolicy::WeightedSum),
            "pareto"       => Ok(SelectionPolicy::Pareto),
            _ => Err(SelectError::UnknownVariant { kind: "selection policy", value: s.to_string() }),
        }
    }
}

// ── RouteRequest ──────────────────────────────────────────────────────────────

/// One routing request, already resolved from job constraints.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRequest {
    pub origin:       String,
    pub destination:  String,
    pub capacity_kwh: f64,
    pub charge_kwh:   f64,
    pub model:        RoutingModel,
    pub profile:      DriverProfile,
    pub policy:       SelectionPolicy,
}

impl RouteRequest {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, capacity_kwh: f64, charge_kwh: f64) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            capacity_kwh,
            charge_kwh,
            model: RoutingModel::default(),
            profile: DriverProfile::default(),
            policy: SelectionPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: RoutingModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_profile(mut self, profile: DriverProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

// ── RouteOptimizer ────────────────────────────────────────────────────────────

/// Routes produced by each model for the same request.  Models that failed
/// are absent.
pub type RouteComparison = Vec<(RoutingModel, RouteCandidate)>;

pub struct RouteOptimizer<S: PathSolver> {
    pub solver:    S,
    pub generator: CandidateGenerator,
    pub selector:  MultiObjectiveSelector,
    pub profiles:  ProfileTable,
}

impl<S: PathSolver> RouteOptimizer<S> {
    /// Selector cost uses the solver's `price_per_kwh`.
    pub fn new(solver: S) -> Self {
        let selector = MultiObjectiveSelector::new(solver.config().price_per_kwh);
        Self {
            solver,
            generator: CandidateGenerator::default(),
            selector,
            profiles: ProfileTable::default(),
        }
    }

    pub fn with_generator(mut self, generator: CandidateGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_profiles(mut self, profiles: ProfileTable) -> Self {
        self.profiles = profiles;
        self
    }

    /// Route `req` with its routing model.
    pub fn route(&self, graph: &RoadGraph, req: &RouteRequest) -> SelectResult<RouteCandidate> {
        debug!("routing {} -> {} with {}", req.origin, req.destination, req.model);
        match req.model {
            RoutingModel::Dijkstra => self.solve(graph, req, SearchMode::Uninformed),
            RoutingModel::Astar => self.solve(graph, req, SearchMode::Heuristic),
            RoutingModel::MultiObjective => self.optimize(graph, req),
        }
    }

    /// Pool, select, then apply the charging policy.
    pub fn optimize(&self, graph: &RoadGraph, req: &RouteRequest) -> SelectResult<RouteCandidate> {
        let mut pool = self.generator.generate(
            &self.solver,
            graph,
            &req.origin,
            &req.destination,
            req.capacity_kwh,
            req.charge_kwh,
        )?;

        let chosen = match req.policy {
            SelectionPolicy::WeightedSum => {
                self.selector.weighted_sum(&pool, &self.profiles.weights(req.profile))?
            }
            SelectionPolicy::Pareto => {
                let front = self.selector.pareto_front(&pool)?;
                debug!("pareto front holds {} of {} candidates", front.len(), pool.len());
                front.first().copied().ok_or(SelectError::EmptyPool)?
            }
        };
        let route = pool.swap_remove(chosen);

        let policy = ChargingPolicy::for_preference(self.profiles.charging_preference(req.profile));
        Ok(policy.apply(route))
    }

    /// Run every model on `req` and keep the ones that succeed.
    pub fn compare(&self, graph: &RoadGraph, req: &RouteRequest) -> RouteComparison {
        RoutingModel::ALL
            .into_iter()
            .filter_map(|model| {
                let req = RouteRequest { model, policy: SelectionPolicy::WeightedSum, ..req.clone() };
                match self.route(graph, &req) {
                    Ok(route) => Some((model, route)),
                    Err(e) => {
                        debug!("{model} failed in comparison: {e}");
                        None
                    }
                }
            })
            .collect()
    }

    fn solve(&self, graph: &RoadGraph, req: &RouteRequest, mode: SearchMode) -> SelectResult<RouteCandidate> {
        Ok(self.solver.solve(
            graph,
            &req.origin,
            &req.destination,
            req.capacity_kwh,
            req.charge_kwh,
            mode,
        )?)
    }
}
