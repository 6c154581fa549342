//! Battery state carried through the search.
//!
//! `BatteryState` is a small `Copy` value: every search label owns its own
//! snapshot, so a transition produces a new state instead of mutating one.
//!
//! Invariant: `0 ≤ remaining_kwh ≤ capacity_kwh`.  Every constructor and
//! transition preserves it; a drain that would go negative returns `None`.

use crate::{CoreError, CoreResult};

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatteryState {
    /// Usable capacity in kWh, constant for a request.
    pub capacity_kwh: f64,
    /// Remaining charge in kWh.
    pub remaining_kwh: f64,
}

impl BatteryState {
    /// Validate and build a battery state.
    ///
    /// Fails if the capacity is not positive or the charge lies outside
    /// `[0, capacity]`.
    pub fn new(capacity_kwh: f64, remaining_kwh: f64) -> CoreResult<Self> {
        let valid = capacity_kwh.is_finite()
            && remaining_kwh.is_finite()
            && capacity_kwh > 0.0
            && (0.0..=capacity_kwh).contains(&remaining_kwh);
        if !valid {
            return Err(CoreError::InvalidBattery {
                capacity: capacity_kwh,
                charge:   remaining_kwh,
            });
        }
        Ok(Self { capacity_kwh, remaining_kwh })
    }

    /// State after consuming `kwh`, or `None` if that would drive the charge
    /// negative.
    #[inline]
    pub fn drain(self, kwh: f64) -> Option<Self> {
        if self.remaining_kwh >= kwh {
            Some(Self { remaining_kwh: self.remaining_kwh - kwh, ..self })
        } else {
            None
        }
    }

    /// State after adding `kwh`, capped at capacity.
    #[inline]
    pub fn charge(self, kwh: f64) -> Self {
        Self {
            remaining_kwh: (self.remaining_kwh + kwh).min(self.capacity_kwh),
            ..self
        }
    }

    #[inline]
    pub fn is_below(self, threshold_kwh: f64) -> bool {
        self.remaining_kwh < threshold_kwh
    }

    /// The same battery with its charge scaled by `factor`, or `None` if the
    /// scaled charge would exceed capacity.
    pub fn scaled(self, factor: f64) -> Option<Self> {
        let remaining = self.remaining_kwh * factor;
        if remaining <= self.capacity_kwh && remaining >= 0.0 {
            Some(Self { remaining_kwh: remaining, ..self })
        } else {
            None
        }
    }
}
