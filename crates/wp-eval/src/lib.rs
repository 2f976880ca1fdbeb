//! Scoring contracts for waterplan.
//!
//! The hydraulic simulator that produces objective scores is not part of this
//! workspace. This crate defines what the search engine expects from it and
//! how raw objective vectors are turned into comparable scalar scores:
//!
//! - [`Evaluator`]: the scenario evaluator contract
//! - [`ResilientEvaluator`]: retries transient failures and degrades to a
//!   worst-case result instead of aborting the search
//! - [`normalize`]: best/worst-relative scalarization shared by every search

pub mod error;
pub mod evaluator;
pub mod normalize;
pub mod objective;
pub mod resilient;

pub use error::{EvalError, EvalResult};
pub use evaluator::{Evaluation, Evaluator, LeakSummary};
pub use normalize::{Orientation, normalize, normalized_score};
pub use objective::{Benchmarks, ObjectiveDef, ObjectiveId, ObjectiveSet, ObjectiveVector, Sense};
pub use resilient::{ResilientEvaluator, RetryPolicy, Scored};
