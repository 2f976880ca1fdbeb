//! Exhaustive search over valve control schedules.
//!
//! Every valve of a group can be opened during any subset of a few daily time
//! regimes. The search evaluates all-closed, all-open and every non-trivial
//! combination of (valve, regime) settings, scoring each against the
//! uncontrolled network.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use wp_core::{ElementId, Real};
use wp_eval::{
    Benchmarks, Evaluator, ObjectiveVector, Orientation, ResilientEvaluator, normalized_score,
};
use wp_network::{ControlRule, LinkStatus, Network, NetworkError, TimeWindow};

use crate::error::{SearchError, SearchResult};

const SECONDS_PER_DAY: u32 = 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSearchConfig {
    /// Daily windows a valve can be opened in.
    #[serde(default = "default_regimes")]
    pub regimes: Vec<TimeWindow>,
    /// Evaluate combinations that open a valve in every regime (as a forced-open
    /// valve) instead of skipping them.
    #[serde(default)]
    pub include_open_all_combinations: bool,
}

fn default_regimes() -> Vec<TimeWindow> {
    vec![
        TimeWindow::new("night", 0, 6 * 3600),
        TimeWindow::new("morning", 6 * 3600, 12 * 3600),
    ]
}

impl Default for ControlSearchConfig {
    fn default() -> Self {
        Self {
            regimes: default_regimes(),
            include_open_all_combinations: false,
        }
    }
}

impl ControlSearchConfig {
    pub fn validate(&self) -> SearchResult<()> {
        if self.regimes.is_empty() {
            return Err(SearchError::invalid_config("at least one time regime is required"));
        }
        let mut names = BTreeSet::new();
        for regime in &self.regimes {
            if !names.insert(regime.name.as_str()) {
                return Err(SearchError::invalid_config(format!(
                    "duplicate time regime '{}'",
                    regime.name
                )));
            }
            if regime.start_s >= regime.end_s || regime.end_s > SECONDS_PER_DAY {
                return Err(SearchError::invalid_config(format!(
                    "time regime '{}' must satisfy start < end <= 24h",
                    regime.name
                )));
            }
        }
        Ok(())
    }
}

/// A valve opened during one regime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlSetting {
    pub valve: ElementId,
    pub regime: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationKind {
    AllClosed,
    AllOpen,
    Combination,
}

/// One point of the control lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfiguration {
    pub kind: ConfigurationKind,
    pub description: String,
    pub settings: Vec<ControlSetting>,
    /// Valves opened in every regime; they are forced open instead of scheduled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forced_open: Vec<ElementId>,
}

impl ControlConfiguration {
    fn uniform(kind: ConfigurationKind) -> Self {
        let description = match kind {
            ConfigurationKind::AllClosed => "all_closed",
            ConfigurationKind::AllOpen => "all_open",
            ConfigurationKind::Combination => "combination",
        };
        Self {
            kind,
            description: description.to_string(),
            settings: Vec::new(),
            forced_open: Vec::new(),
        }
    }

    /// Apply this configuration to `network`, whose group valves are `valves`.
    pub fn apply(
        &self,
        network: &mut Network,
        valves: &[ElementId],
        regimes: &[TimeWindow],
    ) -> SearchResult<()> {
        match self.kind {
            ConfigurationKind::AllClosed => network.set_valve_statuses(valves, LinkStatus::Closed)?,
            ConfigurationKind::AllOpen => network.set_valve_statuses(valves, LinkStatus::Open)?,
            ConfigurationKind::Combination => {
                network.set_valve_statuses(valves, LinkStatus::Closed)?;
                network.set_valve_statuses(&self.forced_open, LinkStatus::Open)?;
                for setting in &self.settings {
                    if self.forced_open.contains(&setting.valve) {
                        continue;
                    }
                    let window = regimes
                        .iter()
                        .find(|r| r.name == setting.regime)
                        .cloned()
                        .ok_or_else(|| {
                            SearchError::invalid_config(format!(
                                "unknown time regime '{}'",
                                setting.regime
                            ))
                        })?;
                    network.add_control(ControlRule {
                        link: setting.valve.clone(),
                        status: LinkStatus::Open,
                        window,
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Lexicographic k-combinations of `0..n`.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }
        let k = self.indices.len();
        // Rightmost index that can still move right.
        let Some(i) = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i) else {
            self.done = true;
            return None;
        };
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

/// Every configuration in evaluation order: all-closed, the combinations by
/// size and lexicographic order, then all-open.
pub fn control_lattice(
    valves: &[ElementId],
    regimes: &[TimeWindow],
    include_open_all_combinations: bool,
) -> Vec<ControlConfiguration> {
    let settings: Vec<ControlSetting> = valves
        .iter()
        .flat_map(|v| {
            regimes.iter().map(move |r| ControlSetting {
                valve: v.clone(),
                regime: r.name.clone(),
            })
        })
        .collect();

    let mut lattice = vec![ControlConfiguration::uniform(ConfigurationKind::AllClosed)];
    for size in 1..settings.len() {
        for combo in Combinations::new(settings.len(), size) {
            let chosen: Vec<ControlSetting> = combo.iter().map(|&i| settings[i].clone()).collect();

            let mut per_valve: BTreeMap<&ElementId, usize> = BTreeMap::new();
            for s in &chosen {
                *per_valve.entry(&s.valve).or_default() += 1;
            }
            let forced_open: Vec<ElementId> = valves
                .iter()
                .filter(|v| per_valve.get(v).copied() == Some(regimes.len()))
                .cloned()
                .collect();
            if !forced_open.is_empty() && !include_open_all_combinations {
                continue;
            }

            let description = chosen
                .iter()
                .map(|s| format!("{}@{}", s.valve, s.regime))
                .collect::<Vec<_>>()
                .join("+");
            lattice.push(ControlConfiguration {
                kind: ConfigurationKind::Combination,
                description,
                settings: chosen,
                forced_open,
            });
        }
    }
    lattice.push(ControlConfiguration::uniform(ConfigurationKind::AllOpen));
    lattice
}

/// One evaluated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRow {
    pub description: String,
    pub kind: ConfigurationKind,
    pub settings: Vec<ControlSetting>,
    pub objectives: ObjectiveVector,
    /// Summed normalized score against the uncontrolled network (lower is better).
    pub score: Real,
    pub total_demand: Real,
    pub total_supply: Real,
    /// The evaluation failed and the worst case was recorded instead.
    #[serde(default)]
    pub degraded: bool,
}

/// All rows of one valve group, in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlTable {
    pub group: String,
    /// Objectives of the uncontrolled network.
    pub benchmark: ObjectiveVector,
    pub rows: Vec<ControlRow>,
}

impl ControlTable {
    /// Rows by ascending score; equal scores keep evaluation order.
    pub fn ranked(&self) -> Vec<&ControlRow> {
        let mut rows: Vec<&ControlRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.score.total_cmp(&b.score));
        rows
    }

    pub fn best(&self) -> Option<&ControlRow> {
        self.ranked().into_iter().next()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlProgress {
    pub done: usize,
    pub total: usize,
    pub description: String,
}

/// Brute-force control search over one valve group.
pub struct ControlSearch<'a, E> {
    evaluator: &'a ResilientEvaluator<E>,
    network: Network,
    group: String,
    valves: Vec<ElementId>,
    config: ControlSearchConfig,
}

impl<'a, E: Evaluator> ControlSearch<'a, E> {
    pub fn new(
        network: Network,
        group: impl Into<String>,
        valves: Vec<ElementId>,
        evaluator: &'a ResilientEvaluator<E>,
        config: ControlSearchConfig,
    ) -> SearchResult<Self> {
        config.validate()?;
        let group = group.into();
        if valves.is_empty() {
            return Err(SearchError::invalid_config(format!(
                "valve group '{group}' is empty"
            )));
        }
        let mut seen = BTreeSet::new();
        for v in &valves {
            if !seen.insert(v) {
                return Err(SearchError::invalid_config(format!(
                    "valve {v} listed twice in group '{group}'"
                )));
            }
            if network.valve(v).is_none() {
                return Err(NetworkError::NotFound { id: v.clone() }.into());
            }
            if network.controls_for(v).next().is_some() {
                tracing::warn!(valve = %v, "valve already carries control rules");
            }
        }
        Ok(Self {
            evaluator,
            network,
            group,
            valves,
            config,
        })
    }

    pub fn lattice(&self) -> Vec<ControlConfiguration> {
        control_lattice(
            &self.valves,
            &self.config.regimes,
            self.config.include_open_all_combinations,
        )
    }

    pub fn run(&self) -> SearchResult<ControlTable> {
        self.run_with_progress(None)
    }

    pub fn run_with_progress(
        &self,
        mut progress: Option<&mut dyn FnMut(ControlProgress)>,
    ) -> SearchResult<ControlTable> {
        let benchmark = self.evaluator.score(&self.network).objectives;
        let benchmarks = Benchmarks::against(self.evaluator.objectives(), benchmark.clone());

        let lattice = self.lattice();
        let total = lattice.len();
        tracing::info!(group = %self.group, valves = self.valves.len(), configurations = total, "control search started");

        let mut rows = Vec::with_capacity(total);
        for (i, configuration) in lattice.into_iter().enumerate() {
            let mut trial = self.network.clone();
            configuration.apply(&mut trial, &self.valves, &self.config.regimes)?;
            let scored = self.evaluator.score(&trial);
            let objectives = scored.objectives.rounded(4);
            let score = normalized_score(&objectives, &benchmarks, Orientation::LowerIsBetter);
            let (total_demand, total_supply) = scored
                .evaluation
                .as_ref()
                .map_or((0.0, 0.0), |e| (e.total_demand, e.total_supply));
            tracing::debug!(description = %configuration.description, score, "configuration evaluated");

            if let Some(cb) = progress.as_deref_mut() {
                cb(ControlProgress {
                    done: i + 1,
                    total,
                    description: configuration.description.clone(),
                });
            }
            rows.push(ControlRow {
                description: configuration.description,
                kind: configuration.kind,
                settings: configuration.settings,
                objectives,
                score,
                total_demand,
                total_supply,
                degraded: scored.is_degraded(),
            });
        }

        Ok(ControlTable {
            group: self.group.clone(),
            benchmark,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valves(n: usize) -> Vec<ElementId> {
        (1..=n).map(|i| ElementId::new(format!("V{i}"))).collect()
    }

    fn regimes(k: usize) -> Vec<TimeWindow> {
        (0..k)
            .map(|i| TimeWindow::new(format!("r{i}"), i as u32 * 3600, (i as u32 + 1) * 3600))
            .collect()
    }

    #[test]
    fn combinations_are_lexicographic() {
        let all: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(2, 3).count(), 0);
        assert_eq!(Combinations::new(3, 0).count(), 1);
    }

    #[test]
    fn two_valves_two_regimes() {
        let v = valves(2);
        let r = default_regimes();
        let lattice = control_lattice(&v, &r, false);
        // 2^4 - 2 = 14 combinations, 6 of which open a valve in both regimes.
        assert_eq!(lattice.len(), 2 + 8);
        assert_eq!(lattice[0].kind, ConfigurationKind::AllClosed);
        assert_eq!(lattice[9].kind, ConfigurationKind::AllOpen);
        assert_eq!(lattice[1].description, "V1@night");
        assert!(lattice.iter().all(|c| c.forced_open.is_empty()));

        let with_open = control_lattice(&v, &r, true);
        assert_eq!(with_open.len(), 2 + 14);
        assert_eq!(with_open.iter().filter(|c| !c.forced_open.is_empty()).count(), 6);
    }

    #[test]
    fn invalid_regimes_are_rejected() {
        let mut config = ControlSearchConfig::default();
        config.regimes.push(TimeWindow::new("night", 0, 60));
        assert!(config.validate().is_err());

        let config = ControlSearchConfig {
            regimes: Vec::new(),
            include_open_all_combinations: false,
        };
        assert!(config.validate().is_err());
    }

    proptest! {
        #[test]
        fn lattice_size_matches_collapse_count(m in 1usize..=3, k in 1usize..=2) {
            let v = valves(m);
            let r = regimes(k);
            let n = m * k;

            // Brute force over bitmasks: proper non-empty subsets with some valve fully chosen.
            let collapsed = (1u32..(1 << n) - 1)
                .filter(|mask| (0..m).any(|valve| (0..k).all(|j| mask & (1 << (valve * k + j)) != 0)))
                .count();

            let skipped = control_lattice(&v, &r, false);
            prop_assert_eq!(skipped.len() - 2, (1usize << n) - 2 - collapsed);

            let kept = control_lattice(&v, &r, true);
            prop_assert_eq!(kept.len() - 2, (1usize << n) - 2);

            let distinct: BTreeSet<Vec<ControlSetting>> =
                kept.iter().map(|c| c.settings.clone()).collect();
            // all_closed and all_open share the empty setting list.
            prop_assert_eq!(distinct.len(), kept.len() - 1);
        }
    }
}
