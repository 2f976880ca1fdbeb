//! Intervention cost model: diameter ladder, pipe replacement and leak repair prices.

use serde::{Deserialize, Serialize};
use wp_core::{Length, Real, mm, to_m, to_mm};

use crate::error::{SearchError, SearchResult};

/// Cost standing in for an action that can never be taken (pipe at its largest class).
///
/// Finite so it survives JSON persistence; any cumulative sum containing it
/// exceeds every realistic budget.
pub const UNREACHABLE_COST: Real = Real::MAX;

/// One commercially available pipe diameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiameterClass {
    pub diameter_mm: Real,
    /// Supply and installation price per metre of pipe.
    pub cost_per_m: Real,
}

/// Leak repair price for host pipes up to a given diameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakRepairTier {
    pub up_to_diameter_mm: Real,
    pub base_cost: Real,
    /// Added per unit of emitter coefficient, in (l/s)/m.
    pub cost_per_coefficient: Real,
}

/// Prices used by the greedy search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Available diameters, ascending.
    pub ladder: Vec<DiameterClass>,
    /// Repair tiers, ascending by diameter.
    pub leak_tiers: Vec<LeakRepairTier>,
    /// Hazen-Williams roughness given to replaced pipes.
    #[serde(default = "default_replacement_roughness")]
    pub replacement_roughness: Real,
}

fn default_replacement_roughness() -> Real {
    120.0
}

impl Default for CostModel {
    fn default() -> Self {
        let ladder = [
            (50.0, 95.0),
            (75.0, 115.0),
            (100.0, 135.0),
            (150.0, 180.0),
            (200.0, 230.0),
            (250.0, 290.0),
            (300.0, 350.0),
            (400.0, 470.0),
            (500.0, 610.0),
            (600.0, 760.0),
            (800.0, 1060.0),
        ]
        .into_iter()
        .map(|(diameter_mm, cost_per_m)| DiameterClass {
            diameter_mm,
            cost_per_m,
        })
        .collect();

        let leak_tiers = vec![
            LeakRepairTier {
                up_to_diameter_mm: 100.0,
                base_cost: 1_500.0,
                cost_per_coefficient: 200.0,
            },
            LeakRepairTier {
                up_to_diameter_mm: 300.0,
                base_cost: 3_000.0,
                cost_per_coefficient: 350.0,
            },
            LeakRepairTier {
                up_to_diameter_mm: 2_000.0,
                base_cost: 6_000.0,
                cost_per_coefficient: 500.0,
            },
        ];

        Self {
            ladder,
            leak_tiers,
            replacement_roughness: default_replacement_roughness(),
        }
    }
}

/// Diameters closer than this are the same class.
const DIAMETER_TOL_MM: Real = 1e-6;

impl CostModel {
    pub fn validate(&self) -> SearchResult<()> {
        if self.ladder.is_empty() {
            return Err(SearchError::invalid_config("diameter ladder is empty"));
        }
        for pair in self.ladder.windows(2) {
            if pair[1].diameter_mm <= pair[0].diameter_mm {
                return Err(SearchError::invalid_config(
                    "diameter ladder must be strictly ascending",
                ));
            }
        }
        if self
            .ladder
            .iter()
            .any(|c| !(c.diameter_mm > 0.0 && c.cost_per_m.is_finite() && c.cost_per_m >= 0.0))
        {
            return Err(SearchError::invalid_config(
                "diameter classes need a positive diameter and a non-negative price",
            ));
        }
        if self.leak_tiers.is_empty() {
            return Err(SearchError::invalid_config("no leak repair tiers"));
        }
        if !self.replacement_roughness.is_finite() || self.replacement_roughness <= 0.0 {
            return Err(SearchError::invalid_config(
                "replacement roughness must be positive",
            ));
        }
        Ok(())
    }

    /// The smallest class strictly larger than `current`, or `None` at the top of the ladder.
    pub fn next_diameter(&self, current: Length) -> Option<Length> {
        let current_mm = to_mm(current);
        self.ladder
            .iter()
            .find(|c| c.diameter_mm > current_mm + DIAMETER_TOL_MM)
            .map(|c| mm(c.diameter_mm))
    }

    pub fn is_largest(&self, diameter: Length) -> bool {
        self.next_diameter(diameter).is_none()
    }

    /// Price of laying `length` of pipe at `diameter`.
    ///
    /// Uses the smallest class that fits the diameter, or the largest class
    /// beyond the end of the ladder.
    pub fn pipe_cost(&self, diameter: Length, length: Length) -> Real {
        let d_mm = to_mm(diameter);
        let per_m = self
            .ladder
            .iter()
            .find(|c| c.diameter_mm + DIAMETER_TOL_MM >= d_mm)
            .or(self.ladder.last())
            .map_or(0.0, |c| c.cost_per_m);
        per_m * to_m(length)
    }

    /// Price of repairing a leak with emitter coefficient `coefficient` ((l/s)/m)
    /// on a pipe of `host_diameter_mm`.
    pub fn leak_repair_cost(&self, coefficient: Real, host_diameter_mm: Real) -> Real {
        self.leak_tiers
            .iter()
            .find(|t| host_diameter_mm <= t.up_to_diameter_mm + DIAMETER_TOL_MM)
            .or(self.leak_tiers.last())
            .map_or(0.0, |t| t.base_cost + t.cost_per_coefficient * coefficient)
    }
}
