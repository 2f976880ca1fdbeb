//! Budgeted greedy improvement search.
//!
//! Each round estimates the marginal benefit of every flagged candidate in
//! isolation, selects a batch of the best benefit-per-cost actions, commits
//! them to the working network and re-flags the candidates whose flow changed
//! most. Candidates that are not re-flagged keep last round's estimate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use wp_core::{ElementId, Real, Tolerances, mm, nearly_equal, nonzero_cost, to_mm};
use wp_eval::{
    Benchmarks, Evaluation, Evaluator, ObjectiveVector, Orientation, ResilientEvaluator, Scored,
    normalized_score,
};
use wp_network::Network;

use crate::actions::{ActionKind, ActionRow, CandidateKey, merge_rows, select_actions};
use crate::catalog::{Catalog, LeakCandidate, PipeCandidate};
use crate::costs::{CostModel, UNREACHABLE_COST};
use crate::error::{SearchError, SearchResult};
use crate::interventions::{
    host_diameter_mm, repair_cost, repair_leak, upgrade_cost, upgrade_pipe,
};

/// Greedy search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedyConfig {
    /// Total money available for the run.
    pub budget: Real,
    /// Width of the near-tie band, as a fraction of the best ratio.
    #[serde(default = "default_actions_ratio")]
    pub actions_ratio: Real,
    /// Minimum mean head loss for a pipe to become a candidate.
    #[serde(default = "default_loss_threshold")]
    pub loss_threshold: Real,
    /// Number of leak candidates kept, by absolute water loss.
    #[serde(default = "default_n_leaks")]
    pub n_leaks: usize,
    /// Fraction of candidates re-estimated each round.
    #[serde(default = "default_reevaluate_ratio")]
    pub reevaluate_ratio: Real,
    /// Wall-clock allowance used to size rounds (hours).
    #[serde(default = "default_total_run_time_h")]
    pub total_run_time_h: Real,
    /// Expected duration of one evaluation (seconds).
    #[serde(default = "default_seconds_per_evaluation")]
    pub seconds_per_evaluation: Real,
}

fn default_actions_ratio() -> Real {
    0.3
}

fn default_loss_threshold() -> Real {
    0.003
}

fn default_n_leaks() -> usize {
    50
}

fn default_reevaluate_ratio() -> Real {
    0.01
}

fn default_total_run_time_h() -> Real {
    2.0
}

fn default_seconds_per_evaluation() -> Real {
    60.0
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            budget: 50_000.0,
            actions_ratio: default_actions_ratio(),
            loss_threshold: default_loss_threshold(),
            n_leaks: default_n_leaks(),
            reevaluate_ratio: default_reevaluate_ratio(),
            total_run_time_h: default_total_run_time_h(),
            seconds_per_evaluation: default_seconds_per_evaluation(),
        }
    }
}

impl GreedyConfig {
    pub fn validate(&self) -> SearchResult<()> {
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(SearchError::invalid_config("budget must be finite and >= 0"));
        }
        if !(0.0..=1.0).contains(&self.actions_ratio) {
            return Err(SearchError::invalid_config("actions_ratio must lie in [0, 1]"));
        }
        if !(self.reevaluate_ratio > 0.0 && self.reevaluate_ratio <= 1.0) {
            return Err(SearchError::invalid_config(
                "reevaluate_ratio must lie in (0, 1]",
            ));
        }
        if !self.total_run_time_h.is_finite() || self.total_run_time_h <= 0.0 {
            return Err(SearchError::invalid_config("total_run_time_h must be > 0"));
        }
        if !self.seconds_per_evaluation.is_finite() || self.seconds_per_evaluation <= 0.0 {
            return Err(SearchError::invalid_config(
                "seconds_per_evaluation must be > 0",
            ));
        }
        if !self.loss_threshold.is_finite() {
            return Err(SearchError::invalid_config("loss_threshold must be finite"));
        }
        Ok(())
    }
}

/// Sizing of a run, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    pub n_pipes: usize,
    pub n_leaks: usize,
    /// Candidates re-estimated per round.
    pub quota: usize,
    pub estimated_rounds: Real,
    /// Per-round spending cap.
    pub iter_budget: Real,
}

impl RunPlan {
    pub fn new(n_pipes: usize, n_leaks: usize, config: &GreedyConfig) -> Self {
        let candidates = (n_pipes + n_leaks) as Real;
        let quota = ((config.reevaluate_ratio * candidates).ceil() as usize).max(1);
        let estimated_rounds =
            config.total_run_time_h * 3600.0 / (quota as Real * config.seconds_per_evaluation);
        Self {
            n_pipes,
            n_leaks,
            quota,
            estimated_rounds,
            iter_budget: config.budget / estimated_rounds,
        }
    }
}

/// Candidate state at the end of a round, sufficient to resume a later run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCheckpoint {
    pub round: usize,
    pub pipes: Vec<PipeCandidate>,
    pub leaks: Vec<LeakCandidate>,
    /// Cached estimates carried into the next round.
    pub evaluations: Vec<ActionRow>,
}

/// One committed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub round: usize,
    #[serde(flatten)]
    pub action: ActionRow,
    /// Cost actually charged at commit.
    pub committed_cost: Real,
    /// Leaks repaired as part of a pipe replacement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absorbed_leaks: Vec<ElementId>,
}

/// Audit record of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    pub elapsed_s: Real,
    /// Isolated estimates computed this round.
    pub evaluations: usize,
    pub actions: Vec<ActionRow>,
    pub cost: Real,
    pub used_budget: Real,
    /// Objectives of the network after this round's commit.
    pub objectives: ObjectiveVector,
    /// The ranked table the selection was made from.
    pub evaluations_snapshot: Vec<ActionRow>,
    /// Absolute flow change per candidate across the commit.
    pub flow_deltas: BTreeMap<ElementId, Real>,
    pub checkpoint: CandidateCheckpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Spend reached the budget.
    BudgetSpent,
    /// The last selection was cut to fit the remaining budget.
    Truncated,
    /// No candidate had an estimate left to select from.
    NoCandidates,
}

#[derive(Debug, Clone)]
pub struct GreedyOutcome {
    pub network: Network,
    pub rounds: Vec<RoundRecord>,
    pub ledger: Vec<LedgerEntry>,
    pub used_budget: Real,
    pub termination: Termination,
    pub catalog: Catalog,
}

/// The greedy optimizer for one run.
///
/// Owns the working network, the candidate catalog and the budget state.
pub struct GreedyOptimizer<'a, E> {
    evaluator: &'a ResilientEvaluator<E>,
    config: GreedyConfig,
    costs: CostModel,
    network: Network,
    catalog: Catalog,
    plan: RunPlan,
    initial: Evaluation,
    resume: Option<Vec<ActionRow>>,
}

impl<'a, E: Evaluator> GreedyOptimizer<'a, E> {
    /// Validate the configuration and derive the candidate catalog.
    ///
    /// The derivation evaluates `network` once, without retries; a failure
    /// there aborts construction.
    pub fn new(
        network: Network,
        evaluator: &'a ResilientEvaluator<E>,
        config: GreedyConfig,
        costs: CostModel,
    ) -> SearchResult<Self> {
        config.validate()?;
        costs.validate()?;

        let (catalog, initial) = Catalog::derive(
            &network,
            evaluator.inner(),
            config.loss_threshold,
            config.n_leaks,
        )?;
        if catalog.is_empty() {
            return Err(SearchError::EmptyCatalog);
        }

        let plan = RunPlan::new(catalog.pipes.len(), catalog.leaks.len(), &config);
        tracing::info!(
            n_pipes = plan.n_pipes,
            n_leaks = plan.n_leaks,
            quota = plan.quota,
            rounds = plan.estimated_rounds,
            iter_budget = plan.iter_budget,
            "greedy run planned"
        );

        Ok(Self {
            evaluator,
            config,
            costs,
            network,
            catalog,
            plan,
            initial,
            resume: None,
        })
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &GreedyConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The evaluation the catalog was derived from.
    pub fn initial_evaluation(&self) -> &Evaluation {
        &self.initial
    }

    /// Continue from a previous run's checkpoint.
    ///
    /// Loads its flags and candidates, resets sunk pipe costs (a new period
    /// pays for a full replacement) and uses its cached estimates in round 1
    /// instead of estimating. Cached upgrade rows are repriced to the full
    /// replacement cost to match.
    pub fn resume_from(&mut self, checkpoint: CandidateCheckpoint) {
        tracing::info!(round = checkpoint.round, "resuming from checkpoint");
        let sunk: BTreeMap<ElementId, Real> = checkpoint
            .pipes
            .iter()
            .map(|p| (p.id.clone(), p.current_cost))
            .collect();
        self.catalog.pipes = checkpoint
            .pipes
            .into_iter()
            .map(|mut p| {
                p.current_cost = 0.0;
                p
            })
            .collect();
        self.catalog.leaks = checkpoint.leaks;

        let rows = checkpoint
            .evaluations
            .into_iter()
            .map(|mut row| {
                if row.kind == ActionKind::PipeUpgrade
                    && row.cost < UNREACHABLE_COST
                    && let Some(&paid) = sunk.get(&row.element)
                    && paid > 0.0
                {
                    row.cost += paid;
                    row.ratio = row.benefit / row.cost;
                }
                row
            })
            .collect();
        self.resume = Some(rows);
    }

    pub fn run(self) -> SearchResult<GreedyOutcome> {
        self.run_with_progress(None)
    }

    /// Run rounds until the budget is spent, reporting each round to `progress`.
    pub fn run_with_progress(
        mut self,
        mut progress: Option<&mut dyn FnMut(&RoundRecord)>,
    ) -> SearchResult<GreedyOutcome> {
        let budget = self.config.budget;
        let mut network = self.network.clone();
        let mut used_budget = 0.0;
        let mut cache: Vec<ActionRow> = Vec::new();
        let mut rounds = Vec::new();
        let mut ledger = Vec::new();
        let mut carried: Option<Scored> = None;
        let mut termination = Termination::BudgetSpent;
        let mut round = 1;

        while used_budget < budget {
            let started = Instant::now();

            // The post-commit evaluation of the previous round already describes this network.
            let current = match carried.take() {
                Some(scored) if !scored.is_degraded() => scored,
                _ => self.evaluator.score(&network),
            };
            let benchmarks = Benchmarks::against(self.evaluator.objectives(), current.objectives.clone());

            let resumed = self.resume.take();
            let is_resumed = resumed.is_some();
            let (fresh, evaluations) = match resumed {
                Some(rows) => (rows, 0),
                None => self.estimate(&network, &benchmarks)?,
            };
            let rows = merge_rows(fresh, &cache, &self.catalog);
            if rows.is_empty() {
                tracing::info!(round, "no candidate estimates left");
                termination = Termination::NoCandidates;
                break;
            }

            let selection = select_actions(
                &rows,
                self.config.actions_ratio,
                self.plan.iter_budget,
                used_budget,
                budget,
            );
            let committed = self.commit(&mut network, &selection.rows, round, used_budget)?;
            let cost = committed.cost;
            used_budget += cost;
            let actions: Vec<ActionRow> =
                committed.entries.iter().map(|e| e.action.clone()).collect();
            let committed_keys: BTreeSet<CandidateKey> =
                actions.iter().map(ActionRow::key).collect();
            ledger.extend(committed.entries);

            let (objectives, flow_deltas) = if is_resumed {
                // Flags come from the checkpoint.
                let objectives = current.objectives.clone();
                carried = Some(current);
                (objectives, BTreeMap::new())
            } else {
                let after = self.evaluator.score(&network);
                let deltas = self.reflag(&current, &after);
                let objectives = after.objectives.clone();
                carried = Some(after);
                (objectives, deltas)
            };

            cache = rows
                .iter()
                .filter(|r| !committed_keys.contains(&r.key()))
                .cloned()
                .collect();

            let record = RoundRecord {
                round,
                elapsed_s: started.elapsed().as_secs_f64(),
                evaluations,
                actions,
                cost,
                used_budget,
                objectives: objectives.rounded(4),
                evaluations_snapshot: rows,
                flow_deltas,
                checkpoint: self.checkpoint(round, &cache),
            };
            tracing::info!(
                round,
                elapsed_s = record.elapsed_s,
                evaluations,
                actions = record.actions.len(),
                cost,
                used_budget,
                objectives = ?objectives.rounded(3),
                "greedy round complete"
            );
            if let Some(cb) = progress.as_deref_mut() {
                cb(&record);
            }
            rounds.push(record);

            round += 1;
            if selection.truncated || committed.refused {
                termination = Termination::Truncated;
                break;
            }
        }

        Ok(GreedyOutcome {
            network,
            rounds,
            ledger,
            used_budget,
            termination,
            catalog: self.catalog,
        })
    }

    fn checkpoint(&self, round: usize, cache: &[ActionRow]) -> CandidateCheckpoint {
        CandidateCheckpoint {
            round,
            pipes: self.catalog.pipes.clone(),
            leaks: self.catalog.leaks.clone(),
            evaluations: cache.to_vec(),
        }
    }

    /// Estimate every flagged candidate in isolation on a clone of `network`.
    ///
    /// Returns the fresh rows and the number of evaluator calls made.
    fn estimate(
        &self,
        network: &Network,
        benchmarks: &Benchmarks,
    ) -> SearchResult<(Vec<ActionRow>, usize)> {
        let ceiling = self.evaluator.objectives().ceiling();
        let mut rows = Vec::new();
        let mut calls = 0;

        for pipe in self.catalog.pipes.iter().filter(|p| p.evaluate) {
            let current = network
                .pipe(&pipe.representative)
                .or_else(|| network.pipe_segments(&pipe.id).next())
                .map(|p| p.diameter);
            let Some(current) = current else {
                tracing::warn!(pipe = %pipe.id, "candidate pipe missing from network");
                continue;
            };

            let Some(next) = self.costs.next_diameter(current) else {
                rows.push(ActionRow {
                    kind: ActionKind::PipeUpgrade,
                    element: pipe.id.clone(),
                    new_diameter_mm: None,
                    host_diameter_mm: None,
                    cost: UNREACHABLE_COST,
                    score: ceiling,
                    benefit: 0.0,
                    ratio: 0.0,
                });
                continue;
            };

            let mut trial = network.clone();
            let upgrade = upgrade_pipe(&mut trial, &pipe.id, next, &self.costs)?;
            let scored = self.evaluator.score(&trial);
            calls += 1;
            let row = score_row(
                ActionKind::PipeUpgrade,
                &pipe.id,
                nonzero_cost(upgrade.cost - pipe.current_cost),
                &scored,
                benchmarks,
                ceiling,
            );
            rows.push(ActionRow {
                new_diameter_mm: Some(to_mm(next)),
                ..row
            });
        }

        for leak in self.catalog.leaks.iter().filter(|l| l.evaluate) {
            let host = host_diameter_mm(network, &leak.id);
            let mut trial = network.clone();
            let cost = repair_leak(&mut trial, &leak.id, &self.costs)?;
            let scored = self.evaluator.score(&trial);
            calls += 1;
            let row = score_row(
                ActionKind::LeakRepair,
                &leak.id,
                nonzero_cost(cost),
                &scored,
                benchmarks,
                ceiling,
            );
            rows.push(ActionRow {
                host_diameter_mm: host,
                ..row
            });
        }

        Ok((rows, calls))
    }

    /// Apply the selected rows to the live network in ranking order.
    ///
    /// Each action is priced against the live network first; one whose charge
    /// would take the spend past the budget is refused and left uncommitted.
    fn commit(
        &mut self,
        network: &mut Network,
        selected: &[ActionRow],
        round: usize,
        used_budget: Real,
    ) -> SearchResult<Committed> {
        let budget = self.config.budget;
        let mut total = 0.0;
        let mut entries = Vec::with_capacity(selected.len());
        let mut refused = false;

        for row in selected {
            if row.cost >= UNREACHABLE_COST {
                continue;
            }
            let charge = match row.kind {
                ActionKind::PipeUpgrade => match row.new_diameter_mm {
                    Some(diameter_mm) => {
                        let sunk = self
                            .catalog
                            .pipe(&row.element)
                            .map_or(0.0, |c| c.current_cost);
                        upgrade_cost(network, &row.element, mm(diameter_mm), &self.costs) - sunk
                    }
                    None => continue,
                },
                ActionKind::LeakRepair => repair_cost(network, &row.element, &self.costs),
            };
            let spent = used_budget + total + charge;
            if spent > budget && !nearly_equal(spent, budget, Tolerances::default()) {
                tracing::warn!(
                    round,
                    element = %row.element,
                    estimated = row.cost,
                    charge,
                    "action would overrun the budget; not committed"
                );
                refused = true;
                continue;
            }
            let (committed_cost, absorbed_leaks) = match row.kind {
                ActionKind::PipeUpgrade => {
                    let Some(diameter_mm) = row.new_diameter_mm else {
                        continue;
                    };
                    let upgrade =
                        upgrade_pipe(network, &row.element, mm(diameter_mm), &self.costs)?;
                    let delta = match self.catalog.pipe_mut(&row.element) {
                        Some(candidate) => {
                            let delta = upgrade.cost - candidate.current_cost;
                            candidate.current_cost = upgrade.cost;
                            delta
                        }
                        None => upgrade.cost,
                    };
                    let hosted: Vec<ElementId> = self
                        .catalog
                        .leaks
                        .iter()
                        .filter(|l| l.pipe == row.element)
                        .map(|l| l.id.clone())
                        .chain(upgrade.absorbed.iter().cloned())
                        .collect();
                    for leak in &hosted {
                        self.catalog.retire_leak(leak);
                    }
                    (delta, upgrade.absorbed)
                }
                ActionKind::LeakRepair => {
                    let cost = repair_leak(network, &row.element, &self.costs)?;
                    self.catalog.retire_leak(&row.element);
                    (cost, Vec::new())
                }
            };
            tracing::debug!(
                round,
                kind = ?row.kind,
                element = %row.element,
                cost = committed_cost,
                "action committed"
            );
            total += committed_cost;
            entries.push(LedgerEntry {
                round,
                action: row.clone(),
                committed_cost,
                absorbed_leaks,
            });
        }

        Ok(Committed {
            cost: total,
            entries,
            refused,
        })
    }

    /// Flag the candidates whose flow changed most across the commit.
    ///
    /// Exactly `min(quota, candidates)` flags are set, ties going to catalog
    /// order. Flags are left alone when either evaluation has no flows.
    fn reflag(&mut self, before: &Scored, after: &Scored) -> BTreeMap<ElementId, Real> {
        let (Some(before), Some(after)) = (before.flows(), after.flows()) else {
            tracing::warn!("flows unavailable; keeping previous re-evaluation flags");
            return BTreeMap::new();
        };
        let delta = |link: &ElementId| {
            let d = (after.get(link).copied().unwrap_or(0.0)
                - before.get(link).copied().unwrap_or(0.0))
            .abs();
            if d.is_finite() { d } else { 0.0 }
        };

        let deltas: Vec<(ElementId, Real)> = self
            .catalog
            .pipes
            .iter()
            .map(|p| (p.id.clone(), delta(&p.representative)))
            .chain(
                self.catalog
                    .leaks
                    .iter()
                    .map(|l| (l.id.clone(), delta(&l.link))),
            )
            .collect();

        let mut order: Vec<usize> = (0..deltas.len()).collect();
        order.sort_by(|&i, &j| deltas[j].1.total_cmp(&deltas[i].1));
        let mut flags = vec![false; deltas.len()];
        for &i in order.iter().take(self.plan.quota) {
            flags[i] = true;
        }

        let n_pipes = self.catalog.pipes.len();
        for (p, flag) in self.catalog.pipes.iter_mut().zip(&flags) {
            p.evaluate = *flag;
        }
        for (l, flag) in self.catalog.leaks.iter_mut().zip(&flags[n_pipes..]) {
            l.evaluate = *flag;
        }

        deltas.into_iter().collect()
    }
}

/// What one round's commit did.
struct Committed {
    cost: Real,
    entries: Vec<LedgerEntry>,
    /// Some selected action was refused for lack of budget.
    refused: bool,
}

/// Score one trial network against the round's benchmarks.
fn score_row(
    kind: ActionKind,
    element: &ElementId,
    cost: Real,
    scored: &Scored,
    benchmarks: &Benchmarks,
    ceiling: Real,
) -> ActionRow {
    let score = normalized_score(&scored.objectives, benchmarks, Orientation::LowerIsBetter);
    let benefit = ceiling - score;
    tracing::debug!(kind = ?kind, element = %element, cost, score, "estimated");
    ActionRow {
        kind,
        element: element.clone(),
        new_diameter_mm: None,
        host_diameter_mm: None,
        cost,
        score,
        benefit,
        ratio: benefit / cost,
    }
}
