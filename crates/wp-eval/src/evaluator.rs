//! Scenario evaluator contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wp_core::{ElementId, Real};
use wp_network::Network;

use crate::error::EvalResult;
use crate::objective::ObjectiveVector;

/// Water loss and repair cost estimate for one leak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakSummary {
    pub leak_id: ElementId,
    /// Pre-split identifier of the pipe carrying the leak.
    pub pipe: ElementId,
    /// Pipe segment the leak sits on.
    pub link: ElementId,
    pub total_water_loss: Real,
    pub total_cost: Real,
}

/// Everything the scoring engine reports about one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub objectives: ObjectiveVector,
    /// Mean absolute flow per link over the simulation horizon.
    #[serde(default)]
    pub flows: BTreeMap<ElementId, Real>,
    /// Mean pressure per node over the simulation horizon.
    #[serde(default)]
    pub pressures: BTreeMap<ElementId, Real>,
    /// Mean head loss per link over the simulation horizon.
    #[serde(default)]
    pub headlosses: BTreeMap<ElementId, Real>,
    #[serde(default)]
    pub leaks: Vec<LeakSummary>,
    #[serde(default)]
    pub total_demand: Real,
    #[serde(default)]
    pub total_supply: Real,
}

/// Trait for the external scoring engine.
///
/// Implementations must be thread-safe (Send + Sync). Calls are blocking and
/// may be expensive; a failure is assumed to be transient unless the input
/// itself is invalid.
pub trait Evaluator: Send + Sync {
    /// Evaluate one scenario made of one or more networks (e.g. one per period).
    fn evaluate(&self, networks: &[&Network]) -> EvalResult<Evaluation>;

    /// Evaluate a single network.
    fn evaluate_one(&self, network: &Network) -> EvalResult<Evaluation> {
        self.evaluate(&[network])
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, networks: &[&Network]) -> EvalResult<Evaluation> {
        (**self).evaluate(networks)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, networks: &[&Network]) -> EvalResult<Evaluation> {
        (**self).evaluate(networks)
    }
}
