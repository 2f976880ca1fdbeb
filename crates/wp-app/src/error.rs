//! Error types for the wp-app service layer.

/// Application error wrapping the errors of the backend crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Project(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Valve group not found: {0}")]
    GroupNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for wp-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<wp_project::ProjectError> for AppError {
    fn from(err: wp_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<wp_project::ValidationError> for AppError {
    fn from(err: wp_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<wp_network::NetworkError> for AppError {
    fn from(err: wp_network::NetworkError) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<wp_search::SearchError> for AppError {
    fn from(err: wp_search::SearchError) -> Self {
        AppError::Search(err.to_string())
    }
}

impl From<wp_results::ResultsError> for AppError {
    fn from(err: wp_results::ResultsError) -> Self {
        match err {
            wp_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
