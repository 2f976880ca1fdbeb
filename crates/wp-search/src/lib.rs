//! Intervention search engines for waterplan.
//!
//! - [`GreedyOptimizer`]: budgeted best-first search over pipe upgrades and
//!   leak repairs, with partial re-estimation between rounds
//! - [`ControlSearch`]: exhaustive enumeration of valve control schedules
//! - [`down_select`]: shortlist of the best control configurations across runs
//!
//! Both engines score networks through a [`wp_eval::ResilientEvaluator`].

pub mod actions;
pub mod catalog;
pub mod costs;
pub mod downselect;
pub mod error;
pub mod exhaustive;
pub mod greedy;
pub mod interventions;

pub use actions::{ActionKind, ActionRow, CandidateKey, Selection, merge_rows, select_actions};
pub use catalog::{Catalog, LeakCandidate, PipeCandidate};
pub use costs::{CostModel, DiameterClass, LeakRepairTier, UNREACHABLE_COST};
pub use downselect::{LabeledTable, Shortlisted, down_select};
pub use error::{SearchError, SearchResult};
pub use exhaustive::{
    Combinations, ConfigurationKind, ControlConfiguration, ControlProgress, ControlRow,
    ControlSearch, ControlSearchConfig, ControlSetting, ControlTable, control_lattice,
};
pub use greedy::{
    CandidateCheckpoint, GreedyConfig, GreedyOptimizer, GreedyOutcome, LedgerEntry, RoundRecord,
    RunPlan, Termination,
};
pub use interventions::{PipeUpgrade, repair_cost, repair_leak, upgrade_cost, upgrade_pipe};
