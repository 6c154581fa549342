//! Multi-objective selection over a candidate pool.
//!
//! # Weighted sum
//!
//! Each objective is normalised to `[0, 1]` against a fixed range, then
//! scaled by its weight:
//!
//! | Objective | Value                    | Range        |
//! |-----------|--------------------------|--------------|
//! | time      | `time_min`               | 10 – 120 min |
//! | distance  | `distance_km`            | 1 – 50 km    |
//! | energy    | `energy_kwh`             | 0.5 – 20 kWh |
//! | cost      | `energy_kwh × price`     | 0.1 – 5      |
//!
//! The lowest total wins; on a tie the earlier candidate is kept.
//!
//! # Pareto
//!
//! `a` dominates `b` when `a` is no worse on time, distance, energy and
//! emissions and strictly better on at least one.  The front is every
//! candidate no other candidate dominates, in pool order.

use evr_core::RouteCandidate;

use crate::{ObjectiveWeights, SelectError, SelectResult};

/// Clamp ranges `(min, max)` used to normalise each objective.
pub const TIME_RANGE_MIN:     (f64, f64) = (10.0, 120.0);
pub const DISTANCE_RANGE_KM:  (f64, f64) = (1.0, 50.0);
pub const ENERGY_RANGE_KWH:   (f64, f64) = (0.5, 20.0);
pub const COST_RANGE:         (f64, f64) = (0.1, 5.0);

#[derive(Clone, Debug)]
pub struct MultiObjectiveSelector {
    /// Price per kWh used to derive the cost objective.
    pub price_per_kwh: f64,
}

impl Default for MultiObjectiveSelector {
    fn default() -> Self {
        Self { price_per_kwh: 0.25 }
    }
}

impl MultiObjectiveSelector {
    pub fn new(price_per_kwh: f64) -> Self {
        Self { price_per_kwh }
    }

    /// Weighted-sum score of one candidate; lower is better.
    pub fn score(&self, route: &RouteCandidate, weights: &ObjectiveWeights) -> f64 {
        weights.time * normalize(route.time_min, TIME_RANGE_MIN)
            + weights.distance * normalize(route.distance_km, DISTANCE_RANGE_KM)
            + weights.energy * normalize(route.energy_kwh, ENERGY_RANGE_KWH)
            + weights.cost * normalize(route.energy_kwh * self.price_per_kwh, COST_RANGE)
    }

    /// Index of the lowest-scoring candidate.
    pub fn weighted_sum(&self, pool: &[RouteCandidate], weights: &ObjectiveWeights) -> SelectResult<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, route) in pool.iter().enumerate() {
            let s = self.score(route, weights);
            if best.is_none_or(|(_, b)| s < b) {
                best = Some((i, s));
            }
        }
        best.map(|(i, _)| i).ok_or(SelectError::EmptyPool)
    }

    /// Indices of the non-dominated candidates, in pool order.
    pub fn pareto_front(&self, pool: &[RouteCandidate]) -> SelectResult<Vec<usize>> {
        if pool.is_empty() {
            return Err(SelectError::EmptyPool);
        }
        let front = (0..pool.len())
            .filter(|&i| {
                !pool
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && dominates(other, &pool[i]))
            })
            .collect();
        Ok(front)
    }
}

/// `true` if `a` Pareto-dominates `b` on time, distance, energy and
/// emissions (all minimised).
pub fn dominates(a: &RouteCandidate, b: &RouteCandidate) -> bool {
    let pairs = [
        (a.time_min, b.time_min),
        (a.distance_km, b.distance_km),
        (a.energy_kwh, b.energy_kwh),
        (a.emissions_g, b.emissions_g),
    ];
    let mut better = false;
    for (x, y) in pairs {
        if x > y {
            return false;
        }
        if x < y {
            better = true;
        }
    }
    better
}

/// Linear map of `value` onto `[0, 1]` over `(min, max)`, clamped.
#[inline]
pub fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}
