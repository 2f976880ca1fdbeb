//! Shortlisting the best control configurations across several result tables.

use serde::{Deserialize, Serialize};
use wp_core::Real;
use wp_eval::{Benchmarks, ObjectiveSet, Orientation, normalized_score};

use crate::exhaustive::{ControlRow, ControlTable};

/// A result table with the label of the run it came from (e.g. a planning period).
#[derive(Debug, Clone, Copy)]
pub struct LabeledTable<'a> {
    pub label: &'a str,
    pub table: &'a ControlTable,
}

/// A row retained by [`down_select`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortlisted {
    pub group: String,
    pub label: String,
    /// 1-based position of the row in its table.
    pub position: usize,
    /// Score relative to the best and worst rows of its own table.
    pub relative_score: Real,
    pub row: ControlRow,
}

/// Keep the `n_best` rows of each table.
///
/// Each table is rescored against the best and worst value of every objective
/// observed in that table, so tables from different runs compare on equal terms.
pub fn down_select(tables: &[LabeledTable<'_>], objectives: &ObjectiveSet, n_best: usize) -> Vec<Shortlisted> {
    let mut shortlisted = Vec::new();
    for labeled in tables {
        let rows = &labeled.table.rows;
        let benchmarks = Benchmarks::from_rows(objectives, rows.iter().map(|r| &r.objectives));

        let mut scored: Vec<(usize, Real)> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                (
                    i,
                    normalized_score(&r.objectives, &benchmarks, Orientation::LowerIsBetter),
                )
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        shortlisted.extend(scored.into_iter().take(n_best).map(|(i, relative_score)| Shortlisted {
            group: labeled.table.group.clone(),
            label: labeled.label.to_string(),
            position: i + 1,
            relative_score,
            row: rows[i].clone(),
        }));
    }
    shortlisted
}
