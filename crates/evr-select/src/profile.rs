//! Driver profiles.
//!
//! A profile supplies the weighted-sum objective weights and a charging
//! preference in `[0, 1]`.  Three profiles are built in:
//!
//! | Profile      | time | distance | energy | cost | charging preference |
//! |--------------|------|----------|--------|------|---------------------|
//! | `eco`        | 0.2  | 0.3      | 0.4    | 0.1  | 0.9                 |
//! | `aggressive` | 0.6  | 0.2      | 0.1    | 0.1  | 0.3                 |
//! | `balanced`   | 0.3  | 0.3      | 0.2    | 0.2  | 0.6                 |

use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::{ObjectiveWeights, SelectError};

// ── DriverProfile ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DriverProfile {
    Eco,
    Aggressive,
    #[default]
    Balanced,
}

impl DriverProfile {
    pub const ALL: [DriverProfile; 3] = [DriverProfile::Eco, DriverProfile::Aggressive, DriverProfile::Balanced];

    pub fn as_str(self) -> &'static str {
        match self {
            DriverProfile::Eco        => "eco",
            DriverProfile::Aggressive => "aggressive",
            DriverProfile::Balanced   => "balanced",
        }
    }

    /// Parse `name`, falling back to [`DriverProfile::Balanced`] with a
    /// warning if it is not a known profile.
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("unknown driver profile {name:?}, using balanced");
            DriverProfile::Balanced
        })
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DriverProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverProfile {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eco"        => Ok(DriverProfile::Eco),
            "aggressive" => Ok(DriverProfile::Aggressive),
            "balanced"   => Ok(DriverProfile::Balanced),
            _ => Err(SelectError::UnknownVariant { kind: "driver profile", value: s.to_string() }),
        }
    }
}

// ── ProfileConfig ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileConfig {
    pub weights: ObjectiveWeights,
    /// Preference for charging stops, `0` (avoid) to `1` (welcome).
    pub charging_preference: f64,
}

// ── ProfileTable ──────────────────────────────────────────────────────────────

/// Lookup from [`DriverProfile`] to its [`ProfileConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileTable {
    configs: [ProfileConfig; 3],
}

impl Default for ProfileTable {
    fn default() -> Self {
        let cfg = |time, distance, energy, cost, charging_preference| ProfileConfig {
            weights: ObjectiveWeights { time, distance, energy, cost },
            charging_preference,
        };
        Self {
            configs: [
                cfg(0.2, 0.3, 0.4, 0.1, 0.9),
                cfg(0.6, 0.2, 0.1, 0.1, 0.3),
                cfg(0.3, 0.3, 0.2, 0.2, 0.6),
            ],
        }
    }
}

impl ProfileTable {
    pub fn get(&self, profile: DriverProfile) -> &ProfileConfig {
        &self.configs[profile.index()]
    }

    pub fn weights(&self, profile: DriverProfile) -> ObjectiveWeights {
        self.get(profile).weights
    }

    pub fn charging_preference(&self, profile: DriverProfile) -> f64 {
        self.get(profile).charging_preference
    }

    /// Replace the configuration of one profile.
    pub fn set(&mut self, profile: DriverProfile, config: ProfileConfig) -> &mut Self {
        self.configs[profile.index()] = config;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (DriverProfile, &ProfileConfig)> + '_ {
        DriverProfile::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}
