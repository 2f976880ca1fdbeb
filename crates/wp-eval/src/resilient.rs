//! Retrying evaluator with worst-case fallback.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use wp_core::{ElementId, Real};
use wp_network::Network;

use crate::error::EvalResult;
use crate::evaluator::{Evaluation, Evaluator};
use crate::objective::{ObjectiveSet, ObjectiveVector};

/// How often to retry a failed evaluation and where to dump unevaluatable networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per evaluation, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Directory receiving a JSON dump of each network that exhausted its attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics_dir: Option<PathBuf>,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            diagnostics_dir: None,
        }
    }
}

/// Outcome of a resilient evaluation.
///
/// A degraded result carries the worst-case objective vector and no hydraulics.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub objectives: ObjectiveVector,
    pub evaluation: Option<Evaluation>,
    pub attempts: u32,
    /// Where the network was dumped when every attempt failed.
    pub diagnostic: Option<PathBuf>,
}

impl Scored {
    pub fn is_degraded(&self) -> bool {
        self.evaluation.is_none()
    }

    pub fn flows(&self) -> Option<&BTreeMap<ElementId, Real>> {
        self.evaluation.as_ref().map(|e| &e.flows)
    }

    pub fn pressures(&self) -> Option<&BTreeMap<ElementId, Real>> {
        self.evaluation.as_ref().map(|e| &e.pressures)
    }
}

/// Wraps an [`Evaluator`] so transient failures never abort a search.
///
/// Each call is attempted up to `max_attempts` times; the first successful
/// attempt wins. When all attempts fail the objective set's worst case is
/// returned instead and the network is dumped for inspection.
#[derive(Debug, Clone)]
pub struct ResilientEvaluator<E> {
    inner: E,
    objectives: ObjectiveSet,
    policy: RetryPolicy,
}

impl<E: Evaluator> ResilientEvaluator<E> {
    pub fn new(inner: E, objectives: ObjectiveSet, policy: RetryPolicy) -> Self {
        Self {
            inner,
            objectives,
            policy,
        }
    }

    /// The wrapped evaluator, for calls that must fail hard.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn objectives(&self) -> &ObjectiveSet {
        &self.objectives
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    pub fn score(&self, network: &Network) -> Scored {
        self.score_many(&[network])
    }

    pub fn score_many(&self, networks: &[&Network]) -> Scored {
        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.inner.evaluate(networks) {
                Ok(evaluation) => {
                    return Scored {
                        objectives: evaluation.objectives.clone(),
                        evaluation: Some(evaluation),
                        attempts: attempt,
                        diagnostic: None,
                    };
                }
                Err(err) => {
                    tracing::warn!(attempt, max_attempts, error = %err, "evaluation failed");
                }
            }
        }

        let diagnostic = self.policy.diagnostics_dir.as_deref().and_then(|dir| {
            match dump_networks(dir, networks) {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::warn!(error = %err, "could not write diagnostic dump");
                    None
                }
            }
        });
        tracing::warn!(
            attempts = max_attempts,
            dump = ?diagnostic,
            "evaluation exhausted its attempts; using worst-case objectives"
        );

        Scored {
            objectives: self.objectives.worst_case(),
            evaluation: None,
            attempts: max_attempts,
            diagnostic,
        }
    }
}

fn dump_networks(dir: &Path, networks: &[&Network]) -> EvalResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
    let path = dir.join(format!("{stamp}_debugging.json"));
    let json = serde_json::to_string_pretty(networks)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
