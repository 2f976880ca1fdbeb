//! Candidate catalog derivation.
//!
//! The catalog is built once per run from a single evaluation of the initial
//! network: pipes ranked by mean head loss and leaks ranked by loss per unit
//! of repair cost.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wp_core::{ElementId, LinkId, Real, nonzero_cost};
use wp_eval::{Evaluation, Evaluator, LeakSummary};
use wp_network::Network;

use crate::error::{SearchError, SearchResult};

/// A pipe eligible for a diameter upgrade, identified by its pre-split id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeCandidate {
    pub id: ElementId,
    /// Segment whose measurements represent the pipe.
    pub representative: LinkId,
    pub mean_headloss: Real,
    /// Cost already sunk into upgrading this pipe during the run.
    pub current_cost: Real,
    pub evaluate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakCandidate {
    pub id: ElementId,
    /// Pre-split id of the host pipe.
    pub pipe: ElementId,
    /// Host segment.
    pub link: LinkId,
    pub total_water_loss: Real,
    pub total_cost: Real,
    /// Water loss per unit of repair cost.
    pub rank: Real,
    pub evaluate: bool,
}

impl LeakCandidate {
    fn from_summary(s: &LeakSummary) -> Self {
        Self {
            id: s.leak_id.clone(),
            pipe: s.pipe.clone(),
            link: s.link.clone(),
            total_water_loss: s.total_water_loss,
            total_cost: s.total_cost,
            rank: s.total_water_loss / nonzero_cost(s.total_cost),
            evaluate: true,
        }
    }
}

/// Pipe and leak candidates plus every leak known at derivation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub pipes: Vec<PipeCandidate>,
    pub leaks: Vec<LeakCandidate>,
    /// All leaks reported by the initial evaluation that are still unrepaired.
    pub registry: BTreeMap<ElementId, LeakSummary>,
}

impl Catalog {
    /// Derive the catalog from one evaluation of `network`.
    ///
    /// Fails if the evaluation fails; there is nothing to search without it.
    pub fn derive<E: Evaluator + ?Sized>(
        network: &Network,
        evaluator: &E,
        loss_threshold: Real,
        n_leaks: usize,
    ) -> SearchResult<(Self, Evaluation)> {
        let evaluation = evaluator
            .evaluate_one(network)
            .map_err(SearchError::Catalog)?;
        let catalog = Self::from_evaluation(network, &evaluation, loss_threshold, n_leaks);
        tracing::info!(
            pipes = catalog.pipes.len(),
            leaks = catalog.leaks.len(),
            registry = catalog.registry.len(),
            "candidate catalog derived"
        );
        Ok((catalog, evaluation))
    }

    pub fn from_evaluation(
        network: &Network,
        evaluation: &Evaluation,
        loss_threshold: Real,
        n_leaks: usize,
    ) -> Self {
        // One entry per pre-split pipe, keeping the segment with the highest loss.
        let mut by_origin: BTreeMap<&ElementId, (&LinkId, Real)> = BTreeMap::new();
        for pipe in network.pipes() {
            let Some(&loss) = evaluation.headlosses.get(&pipe.id) else {
                continue;
            };
            by_origin
                .entry(&pipe.origin)
                .and_modify(|best| {
                    if loss > best.1 {
                        *best = (&pipe.id, loss);
                    }
                })
                .or_insert((&pipe.id, loss));
        }

        let mut pipes: Vec<PipeCandidate> = by_origin
            .into_iter()
            .filter(|(_, (_, loss))| *loss >= loss_threshold)
            .map(|(origin, (segment, loss))| PipeCandidate {
                id: origin.clone(),
                representative: segment.clone(),
                mean_headloss: loss,
                current_cost: 0.0,
                evaluate: true,
            })
            .collect();
        pipes.sort_by(|a, b| b.mean_headloss.total_cmp(&a.mean_headloss));

        // Top-K by absolute loss, then ordered by loss per unit cost.
        let mut leaks: Vec<LeakCandidate> =
            evaluation.leaks.iter().map(LeakCandidate::from_summary).collect();
        leaks.sort_by(|a, b| b.total_water_loss.total_cmp(&a.total_water_loss));
        leaks.truncate(n_leaks);
        leaks.sort_by(|a, b| b.rank.total_cmp(&a.rank));

        let registry = evaluation
            .leaks
            .iter()
            .map(|s| (s.leak_id.clone(), s.clone()))
            .collect();

        Self {
            pipes,
            leaks,
            registry,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty() && self.leaks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pipes.len() + self.leaks.len()
    }

    pub fn pipe(&self, id: &ElementId) -> Option<&PipeCandidate> {
        self.pipes.iter().find(|p| &p.id == id)
    }

    pub fn pipe_mut(&mut self, id: &ElementId) -> Option<&mut PipeCandidate> {
        self.pipes.iter_mut().find(|p| &p.id == id)
    }

    pub fn leak(&self, id: &ElementId) -> Option<&LeakCandidate> {
        self.leaks.iter().find(|l| &l.id == id)
    }

    /// Number of candidates flagged for re-estimation.
    pub fn flagged(&self) -> usize {
        self.pipes.iter().filter(|p| p.evaluate).count()
            + self.leaks.iter().filter(|l| l.evaluate).count()
    }

    /// Drop a repaired leak from the candidates and from the registry.
    pub fn retire_leak(&mut self, id: &ElementId) {
        self.leaks.retain(|l| &l.id != id);
        self.registry.remove(id);
    }
}
