//! Objective weights for weighted-sum selection.

use crate::{SelectError, SelectResult};

/// Four nonnegative weights.  They are not normalised and need not sum to 1.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectiveWeights {
    pub time:     f64,
    pub distance: f64,
    pub energy:   f64,
    pub cost:     f64,
}

impl ObjectiveWeights {
    /// Fails with [`SelectError::InvalidWeight`] on a negative or non-finite
    /// component.
    pub fn new(time: f64, distance: f64, energy: f64, cost: f64) -> SelectResult<Self> {
        for (name, value) in [("time", time), ("distance", distance), ("energy", energy), ("cost", cost)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SelectError::InvalidWeight { name, value });
            }
        }
        Ok(Self { time, distance, energy, cost })
    }
}
