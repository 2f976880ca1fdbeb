//! Action rows, the evaluation cache overlay and the per-round selection rule.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use wp_core::{ElementId, Real};

use crate::catalog::Catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PipeUpgrade,
    LeakRepair,
}

/// Identity of a candidate in the evaluation cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateKey {
    pub kind: ActionKind,
    pub element: ElementId,
}

impl CandidateKey {
    pub fn pipe(element: ElementId) -> Self {
        Self {
            kind: ActionKind::PipeUpgrade,
            element,
        }
    }

    pub fn leak(element: ElementId) -> Self {
        Self {
            kind: ActionKind::LeakRepair,
            element,
        }
    }
}

/// The estimated effect of taking one action on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    pub kind: ActionKind,
    pub element: ElementId,
    /// Diameter after an upgrade; `None` for repairs and for pipes already at the top class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_diameter_mm: Option<Real>,
    /// Diameter of the pipe carrying a leak.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_diameter_mm: Option<Real>,
    /// Marginal cost, never zero.
    pub cost: Real,
    /// Summed normalized score of the trial network (lower is better).
    pub score: Real,
    pub benefit: Real,
    /// Benefit per unit cost.
    pub ratio: Real,
}

impl ActionRow {
    pub fn key(&self) -> CandidateKey {
        CandidateKey {
            kind: self.kind,
            element: self.element.clone(),
        }
    }
}

/// Overlay freshly estimated rows on last round's rows.
///
/// `merge(fresh, stale) = fresh ∪ (stale − keys(fresh))`, restricted to
/// candidates still in the catalog and assembled in catalog order (pipes,
/// then leaks). The result is sorted by ratio, descending; ties keep catalog
/// order.
pub fn merge_rows(fresh: Vec<ActionRow>, stale: &[ActionRow], catalog: &Catalog) -> Vec<ActionRow> {
    let mut fresh: BTreeMap<CandidateKey, ActionRow> =
        fresh.into_iter().map(|r| (r.key(), r)).collect();
    let stale: BTreeMap<CandidateKey, &ActionRow> = stale.iter().map(|r| (r.key(), r)).collect();

    let keys = catalog
        .pipes
        .iter()
        .map(|p| CandidateKey::pipe(p.id.clone()))
        .chain(catalog.leaks.iter().map(|l| CandidateKey::leak(l.id.clone())));

    let mut rows: Vec<ActionRow> = keys
        .filter_map(|key| {
            fresh
                .remove(&key)
                .or_else(|| stale.get(&key).map(|r| (*r).clone()))
        })
        .collect();
    rows.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    rows
}

/// Rows chosen for commit in one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub rows: Vec<ActionRow>,
    /// Set when the selection was cut to fit the remaining budget; the run ends after this round.
    pub truncated: bool,
}

impl Selection {
    pub fn cost(&self) -> Real {
        self.rows.iter().map(|r| r.cost).sum()
    }

    pub fn keys(&self) -> BTreeSet<CandidateKey> {
        self.rows.iter().map(ActionRow::key).collect()
    }
}

/// Longest prefix of `rows` whose cumulative cost stays within `cap`.
fn prefix_within(rows: &[ActionRow], cap: Real) -> Vec<ActionRow> {
    let mut spent = 0.0;
    rows.iter()
        .take_while(|r| {
            spent += r.cost;
            spent <= cap
        })
        .cloned()
        .collect()
}

/// Pick this round's actions from rows sorted by ratio, descending.
///
/// Takes the band of rows within `actions_ratio` of the best ratio. When the
/// band costs no more than `iter_budget`, the round is instead filled in ratio
/// order up to `iter_budget`. A selection that would overrun the total budget
/// is cut to what remains and marks the run for termination.
pub fn select_actions(
    rows: &[ActionRow],
    actions_ratio: Real,
    iter_budget: Real,
    used_budget: Real,
    budget: Real,
) -> Selection {
    let Some(top) = rows.first() else {
        return Selection::default();
    };
    let floor = top.ratio * (1.0 - actions_ratio);
    let band_len = rows.iter().take_while(|r| r.ratio >= floor).count();
    let band = &rows[..band_len];

    let band_cost: Real = band.iter().map(|r| r.cost).sum();
    let mut chosen = if band_cost <= iter_budget {
        prefix_within(rows, iter_budget)
    } else {
        band.to_vec()
    };

    let mut truncated = false;
    let chosen_cost: Real = chosen.iter().map(|r| r.cost).sum();
    if used_budget + chosen_cost > budget {
        chosen = prefix_within(&chosen, budget - used_budget);
        truncated = true;
    }

    Selection {
        rows: chosen,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LeakCandidate, PipeCandidate};

    fn row(kind: ActionKind, id: &str, cost: Real, ratio: Real) -> ActionRow {
        ActionRow {
            kind,
            element: ElementId::from(id),
            new_diameter_mm: None,
            host_diameter_mm: None,
            cost,
            score: 0.0,
            benefit: ratio * cost,
            ratio,
        }
    }

    fn pipe(id: &str, cost: Real, ratio: Real) -> ActionRow {
        row(ActionKind::PipeUpgrade, id, cost, ratio)
    }

    fn leak(id: &str, cost: Real, ratio: Real) -> ActionRow {
        row(ActionKind::LeakRepair, id, cost, ratio)
    }

    fn catalog(pipes: &[&str], leaks: &[&str]) -> Catalog {
        Catalog {
            pipes: pipes
                .iter()
                .map(|id| PipeCandidate {
                    id: ElementId::from(*id),
                    representative: ElementId::from(*id),
                    mean_headloss: 1.0,
                    current_cost: 0.0,
                    evaluate: false,
                })
                .collect(),
            leaks: leaks
                .iter()
                .map(|id| LeakCandidate {
                    id: ElementId::from(*id),
                    pipe: ElementId::from("P"),
                    link: ElementId::from("P"),
                    total_water_loss: 1.0,
                    total_cost: 1.0,
                    rank: 1.0,
                    evaluate: false,
                })
                .collect(),
            registry: BTreeMap::new(),
        }
    }

    fn ids(rows: &[ActionRow]) -> Vec<&str> {
        rows.iter().map(|r| r.element.as_str()).collect()
    }

    #[test]
    fn fresh_rows_win_over_stale() {
        let cat = catalog(&["P1", "P2"], &["L1"]);
        let stale = vec![pipe("P1", 10.0, 1.0), pipe("P2", 10.0, 2.0), leak("L1", 1.0, 3.0)];
        let fresh = vec![pipe("P2", 10.0, 5.0)];
        let merged = merge_rows(fresh, &stale, &cat);
        assert_eq!(ids(&merged), ["P2", "L1", "P1"]);
        assert_eq!(merged[0].ratio, 5.0);
    }

    #[test]
    fn rows_for_departed_candidates_are_dropped() {
        let cat = catalog(&["P1"], &[]);
        let stale = vec![pipe("P1", 10.0, 1.0), leak("L1", 1.0, 3.0)];
        let merged = merge_rows(Vec::new(), &stale, &cat);
        assert_eq!(ids(&merged), ["P1"]);
    }

    #[test]
    fn ties_keep_catalog_order() {
        let cat = catalog(&["P2", "P1"], &["L1"]);
        let fresh = vec![leak("L1", 1.0, 1.0), pipe("P1", 1.0, 1.0), pipe("P2", 1.0, 1.0)];
        let merged = merge_rows(fresh, &[], &cat);
        assert_eq!(ids(&merged), ["P2", "P1", "L1"]);
    }

    #[test]
    fn band_over_round_cap_is_taken_whole() {
        let rows = [pipe("a", 60.0, 10.0), pipe("b", 60.0, 9.5), pipe("c", 10.0, 1.0)];
        let sel = select_actions(&rows, 0.1, 100.0, 0.0, 1_000.0);
        assert_eq!(ids(&sel.rows), ["a", "b"]);
        assert!(!sel.truncated);
    }

    #[test]
    fn cheap_band_is_filled_up_to_round_cap() {
        let rows = [pipe("a", 20.0, 10.0), pipe("b", 30.0, 2.0), pipe("c", 60.0, 1.0)];
        let sel = select_actions(&rows, 0.1, 55.0, 0.0, 1_000.0);
        assert_eq!(ids(&sel.rows), ["a", "b"]);
    }

    #[test]
    fn overrun_is_cut_to_remaining_budget() {
        let rows = [leak("a", 40.0, 10.0), pipe("b", 60.0, 9.9)];
        let sel = select_actions(&rows, 0.5, 10.0, 950.0, 1_000.0);
        assert_eq!(ids(&sel.rows), ["a"]);
        assert!(sel.truncated);
        assert_eq!(sel.cost(), 40.0);
    }

    #[test]
    fn empty_rows_select_nothing() {
        let sel = select_actions(&[], 0.3, 10.0, 0.0, 10.0);
        assert!(sel.rows.is_empty());
        assert!(!sel.truncated);
    }
}
