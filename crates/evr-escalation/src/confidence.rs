//! Confidence estimation.
//!
//! Two estimators read the same [`RouteMetrics`] document:
//!
//! - [`RouteBased`] scores a route found by graph search from its length,
//!   charging stops, energy and efficiency; clamped to `[0.1, 1.0]`.
//! - [`MetricsBased`] scores a degraded result from its unknown-segment
//!   fraction and fallback count; clamped to `[0.0, 1.0]`.
//!
//! Missing metrics count as zero.

use evr_core::RouteCandidate;

use crate::RouteMetrics;

/// Scalar trust in a computed route.
pub trait ConfidenceEstimator {
    fn estimate(&self, metrics: &RouteMetrics) -> f64;
}

/// Heuristic score of a searched route.
///
/// | Condition                       | Adjustment                  |
/// |---------------------------------|-----------------------------|
/// | base                            | 0.9                         |
/// | distance > 20 km                | −0.1                        |
/// | more than 2 charging stops      | −0.05 per stop beyond 2     |
/// | energy > 15 kWh                 | −0.1                        |
/// | km per kWh > 15                 | +0.05                       |
#[derive(Copy, Clone, Debug, Default)]
pub struct RouteBased;

impl ConfidenceEstimator for RouteBased {
    fn estimate(&self, metrics: &RouteMetrics) -> f64 {
        let distance_km = metrics.distance_m.unwrap_or(0.0) / 1000.0;
        let energy_kwh  = metrics.energy_kwh.unwrap_or(0.0);
        let stops       = metrics.charging_stops.unwrap_or(0);

        let mut score = 0.9;
        if distance_km > 20.0 {
            score -= 0.1;
        }
        score -= 0.05 * stops.saturating_sub(2) as f64;
        if energy_kwh > 15.0 {
            score -= 0.1;
        }
        // Energy floor keeps a zero-energy route finite.
        if distance_km / energy_kwh.max(0.1) > 15.0 {
            score += 0.05;
        }
        score.clamp(0.1, 1.0)
    }
}

/// `1 − 0.8 × unknown_fraction − 0.03 × min(fallbacks, 5)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct MetricsBased;

impl ConfidenceEstimator for MetricsBased {
    fn estimate(&self, metrics: &RouteMetrics) -> f64 {
        let unknown   = metrics.unknown_segment_fraction.unwrap_or(0.0);
        let fallbacks = metrics.fallbacks.unwrap_or(0).min(5);
        (1.0 - unknown * 0.8 - fallbacks as f64 * 0.03).clamp(0.0, 1.0)
    }
}

/// [`RouteBased`] score of `route`.
pub fn route_confidence(route: &RouteCandidate) -> f64 {
    RouteBased.estimate(&RouteMetrics::from_route(route))
}
