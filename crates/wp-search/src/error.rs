//! Error types for the search engines.

use thiserror::Error;
use wp_core::WpError;
use wp_eval::EvalError;
use wp_network::NetworkError;

/// Errors that abort a search.
///
/// Transient evaluator failures never show up here; they are absorbed by
/// [`wp_eval::ResilientEvaluator`].
#[derive(Error, Debug)]
pub enum SearchError {
    /// The initial evaluation that seeds the candidate catalog failed.
    #[error("Candidate catalog derivation failed: {0}")]
    Catalog(#[source] EvalError),

    #[error("No pipe or leak candidates to search over")]
    EmptyCatalog,

    #[error("Invalid search configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

pub type SearchResult<T> = Result<T, SearchError>;

impl SearchError {
    pub fn invalid_config(what: impl Into<String>) -> Self {
        SearchError::InvalidConfig { what: what.into() }
    }
}

impl From<SearchError> for WpError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Catalog(_) => WpError::InvalidArg { what: "catalog" },
            SearchError::EmptyCatalog => WpError::InvalidArg {
                what: "empty catalog",
            },
            SearchError::InvalidConfig { what } => WpError::Invariant { what },
            SearchError::Network(e) => e.into(),
        }
    }
}
