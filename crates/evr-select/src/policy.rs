//! Charging policy applied to the selected route.

use evr_core::RouteCandidate;
use log::debug;

/// Post-selection charging stage, picked from the driver's charging
/// preference.
///
/// Both variants return the route unchanged.  The search already inserts a
/// stop only when the battery requires one, and charger choice (power
/// class, timing) is not modelled yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChargingPolicy {
    MinimizeStops,
    OptimizeEfficiency,
}

impl ChargingPolicy {
    /// `MinimizeStops` below a preference of 0.5, `OptimizeEfficiency` at or
    /// above it.
    pub fn for_preference(charging_preference: f64) -> Self {
        if charging_preference < 0.5 {
            ChargingPolicy::MinimizeStops
        } else {
            ChargingPolicy::OptimizeEfficiency
        }
    }

    pub fn apply(self, route: RouteCandidate) -> RouteCandidate {
        debug!(
            "charging policy {self:?}: {} stop(s) kept",
            route.charging_stop_count(),
        );
        route
    }
}
