//! Service layer for waterplan.
//!
//! Wires a run configuration, a caller-supplied scoring engine and the run
//! store into greedy and control-search runs with progress reporting.

pub mod error;
pub mod progress;
pub mod run_service;

pub use error::{AppError, AppResult};
pub use progress::{ControlSearchProgress, GreedyProgress, RunProgressEvent, RunStage};
pub use run_service::{
    ControlSearchRequest, ControlSearchResponse, GreedyRequest, GreedyResponse, RunMode,
    RunOptions, RunResponse, list_runs, run_control_search, run_control_search_with_progress,
    run_greedy, run_greedy_with_progress, shortlist_controls,
};
