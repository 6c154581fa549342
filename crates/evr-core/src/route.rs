//! Route candidates produced by the solver and consumed by selection,
//! confidence estimation and escalation.

use std::fmt;
use std::str::FromStr;

use crate::{CoreError, GeoPoint};

// ── PowerClass ────────────────────────────────────────────────────────────────

/// Charger power class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PowerClass {
    Standard,
    Fast,
    UltraFast,
}

impl PowerClass {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerClass::Standard  => "standard",
            PowerClass::Fast      => "fast",
            PowerClass::UltraFast => "ultra_fast",
        }
    }
}

impl fmt::Display for PowerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standard"   => Ok(PowerClass::Standard),
            "fast"       => Ok(PowerClass::Fast),
            "ultra_fast" => Ok(PowerClass::UltraFast),
            other => Err(CoreError::Config(format!(
                "invalid power class {other:?}: expected standard, fast or ultra_fast"
            ))),
        }
    }
}

// ── ChargingStop ──────────────────────────────────────────────────────────────

/// A charging station visited along a route.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChargingStop {
    pub station_id: String,
    pub location:   GeoPoint,
    pub power_kw:   f64,
    pub power_class: PowerClass,
}

// ── RouteCandidate ────────────────────────────────────────────────────────────

/// An accepted path with its aggregate metrics.
///
/// `sequence`, `coordinates` and `battery_profile` are aligned: entry `i` of
/// each describes the `i`-th waypoint.  A node appears at most once, except
/// when it is re-entered right after a charging detour.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteCandidate {
    /// Node and station identifiers in traversal order.
    pub sequence: Vec<String>,
    /// Position of each waypoint.
    pub coordinates: Vec<GeoPoint>,
    /// Remaining charge (kWh) on arrival at each waypoint.
    pub battery_profile: Vec<f64>,
    pub distance_km: f64,
    pub time_min: f64,
    pub energy_kwh: f64,
    pub emissions_g: f64,
    /// Stations present in `sequence`, in order.
    pub charging_stops: Vec<ChargingStop>,
}

impl RouteCandidate {
    #[inline]
    pub fn charging_stop_count(&self) -> usize {
        self.charging_stops.len()
    }

    /// Number of waypoints.
    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// `true` if origin and destination are the same place.
    pub fn is_trivial(&self) -> bool {
        self.sequence.len() == 1
    }

    pub fn origin(&self) -> Option<&str> {
        self.sequence.first().map(String::as_str)
    }

    pub fn destination(&self) -> Option<&str> {
        self.sequence.last().map(String::as_str)
    }
}
