//! Candidate pool generation.
//!
//! A pool is built by solving the same request several ways: once per
//! [`SearchMode`], then uninformed again with the initial charge scaled by
//! each factor in [`CandidateGenerator::factors`].  Scaled charges above the
//! battery capacity are skipped.

use log::debug;

use evr_core::{BatteryState, RouteCandidate};
use evr_network::RoadGraph;

use crate::{PathSolver, RoutingError, RoutingResult, SearchMode};

/// Initial-charge perturbations applied after the two mode runs.
pub const DEFAULT_CHARGE_FACTORS: [f64; 5] = [0.8, 0.9, 1.0, 1.1, 1.2];

#[derive(Clone, Debug)]
pub struct CandidateGenerator {
    pub factors: Vec<f64>,
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self { factors: DEFAULT_CHARGE_FACTORS.to_vec() }
    }
}

impl CandidateGenerator {
    pub fn with_factors(factors: impl Into<Vec<f64>>) -> Self {
        Self { factors: factors.into() }
    }

    /// Solve every variant and collect the ones that found a route, in run
    /// order.
    ///
    /// `NoRouteFound` from a single run is skipped.  Any other error (an
    /// unknown endpoint, an invalid battery) aborts generation.  If nothing
    /// succeeds the result is [`RoutingError::NoCandidates`].
    pub fn generate<S: PathSolver + ?Sized>(
        &self,
        solver:             &S,
        graph:              &RoadGraph,
        origin:             &str,
        destination:        &str,
        capacity_kwh:       f64,
        initial_charge_kwh: f64,
    ) -> RoutingResult<Vec<RouteCandidate>> {
        let base = BatteryState::new(capacity_kwh, initial_charge_kwh)?;

        let mut runs: Vec<(SearchMode, f64)> = vec![
            (SearchMode::Uninformed, initial_charge_kwh),
            (SearchMode::Heuristic, initial_charge_kwh),
        ];
        for &factor in &self.factors {
            match base.scaled(factor) {
                Some(b) => runs.push((SearchMode::Uninformed, b.remaining_kwh)),
                None => debug!("skipping charge factor {factor}: exceeds {capacity_kwh} kWh capacity"),
            }
        }

        let mut pool = Vec::with_capacity(runs.len());
        for (mode, charge) in runs {
            match solver.solve(graph, origin, destination, capacity_kwh, charge, mode) {
                Ok(route) => pool.push(route),
                Err(RoutingError::NoRouteFound { .. }) => {
                    debug!("{mode} run with {charge:.2} kWh found no route");
                }
                Err(e) => return Err(e),
            }
        }

        if pool.is_empty() {
            return Err(RoutingError::NoCandidates {
                from: origin.to_string(),
                to:   destination.to_string(),
            });
        }
        debug!("generated {} candidates {origin} -> {destination}", pool.len());
        Ok(pool)
    }
}
