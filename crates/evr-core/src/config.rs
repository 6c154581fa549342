//! Numeric model constants used by the solver and the selector.
//!
//! These are pluggable constants, not a physical simulation: energy is
//! linear in distance and every charging stop adds a fixed amount.

use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Energy, time, emissions, cost and charging constants.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Energy consumed per kilometre (kWh/km).
    pub energy_per_km: f64,
    /// Average-speed factor (minutes per km).  2.5 ≈ 24 km/h city driving.
    pub minutes_per_km: f64,
    /// Grid emissions factor (g CO2 per kWh).
    pub emissions_g_per_kwh: f64,
    /// Electricity price used by the cost objective (per kWh).
    pub price_per_kwh: f64,
    /// Below this remaining charge the search scans nearby stations.
    pub low_battery_kwh: f64,
    /// Charge added by one stop (capped at capacity).
    pub charge_increment_kwh: f64,
    /// Great-circle radius of the station scan.
    pub station_radius_km: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            energy_per_km:        0.2,
            minutes_per_km:       2.5,
            emissions_g_per_kwh:  84.5,
            price_per_kwh:        0.25,
            low_battery_kwh:      5.0,
            charge_increment_kwh: 20.0,
            station_radius_km:    5.0,
        }
    }
}

impl SolverConfig {
    /// Read overrides from an environment-style lookup.  Missing keys keep
    /// their defaults; unparseable values are an error.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(Self {
            energy_per_km:        parse_var(&lookup, "EV_ENERGY_PER_KM", d.energy_per_km)?,
            minutes_per_km:       parse_var(&lookup, "EV_MINUTES_PER_KM", d.minutes_per_km)?,
            emissions_g_per_kwh:  parse_var(&lookup, "EV_EMISSIONS_G_PER_KWH", d.emissions_g_per_kwh)?,
            price_per_kwh:        parse_var(&lookup, "EV_PRICE_PER_KWH", d.price_per_kwh)?,
            low_battery_kwh:      parse_var(&lookup, "EV_LOW_BATTERY_KWH", d.low_battery_kwh)?,
            charge_increment_kwh: parse_var(&lookup, "EV_CHARGE_INCREMENT_KWH", d.charge_increment_kwh)?,
            station_radius_km:    parse_var(&lookup, "EV_STATION_RADIUS_KM", d.station_radius_km)?,
        })
    }

    #[inline]
    pub fn energy_for(&self, distance_km: f64) -> f64 {
        distance_km * self.energy_per_km
    }

    #[inline]
    pub fn time_for(&self, distance_km: f64) -> f64 {
        distance_km * self.minutes_per_km
    }

    #[inline]
    pub fn emissions_for(&self, energy_kwh: f64) -> f64 {
        energy_kwh * self.emissions_g_per_kwh
    }
}

/// Parse `key` from `lookup`, falling back to `default` when the key is
/// absent or blank.
pub fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> CoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| CoreError::Config(format!("{key}={raw:?}: {e}"))),
        _ => Ok(default),
    }
}
