//! Error types for scenario evaluation.

use thiserror::Error;

/// Errors raised by an [`crate::Evaluator`] implementation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The simulation did not converge or otherwise failed; retrying may succeed.
    #[error("Simulation failed: {message}")]
    Simulation { message: String },

    #[error("Invalid evaluation input: {what}")]
    InvalidInput { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub fn simulation(message: impl Into<String>) -> Self {
        EvalError::Simulation {
            message: message.into(),
        }
    }
}
