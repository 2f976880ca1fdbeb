//! Result data types.

use serde::{Deserialize, Serialize};
use wp_core::Real;
use wp_eval::ObjectiveVector;
use wp_project::ValveGroups;
use wp_search::{GreedyOutcome, RoundRecord, Termination};

pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    /// Name of the network the run started from.
    pub network: String,
    pub config_name: String,
    pub timestamp: String,
    pub run_type: RunType,
    pub engine_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunType {
    Greedy {
        budget: Real,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resumed_from: Option<RunId>,
    },
    ControlSearch {
        /// Every group searched, with its valves.
        groups: ValveGroups,
    },
}

/// One line of the round log (`rounds.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundLog {
    pub round: usize,
    pub elapsed_s: Real,
    pub evaluations: usize,
    pub actions: usize,
    pub cost: Real,
    pub used_budget: Real,
    pub objectives: ObjectiveVector,
}

impl From<&RoundRecord> for RoundLog {
    fn from(record: &RoundRecord) -> Self {
        Self {
            round: record.round,
            elapsed_s: record.elapsed_s,
            evaluations: record.evaluations,
            actions: record.actions.len(),
            cost: record.cost,
            used_budget: record.used_budget,
            objectives: record.objectives.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedySummary {
    pub rounds: usize,
    pub actions: usize,
    pub used_budget: Real,
    pub termination: Termination,
    /// Objectives after the last round, if any round ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_objectives: Option<ObjectiveVector>,
}

impl From<&GreedyOutcome> for GreedySummary {
    fn from(outcome: &GreedyOutcome) -> Self {
        Self {
            rounds: outcome.rounds.len(),
            actions: outcome.ledger.len(),
            used_budget: outcome.used_budget,
            termination: outcome.termination,
            final_objectives: outcome.rounds.last().map(|r| r.objectives.clone()),
        }
    }
}
