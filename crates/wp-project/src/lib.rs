//! wp-project: run configuration and valve group files, with validation.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, check_groups_against, validate_config, validate_groups};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<RunConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RunConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_yaml(path: &Path, config: &RunConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<RunConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RunConfig = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_json(path: &Path, config: &RunConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a run configuration, choosing the format from the file extension.
pub fn load_config(path: &Path) -> ProjectResult<RunConfig> {
    if is_json(path) {
        load_json(path)
    } else {
        load_yaml(path)
    }
}

/// Load a valve group file (`.json`, otherwise YAML).
pub fn load_groups(path: &Path) -> ProjectResult<ValveGroups> {
    let content = std::fs::read_to_string(path)?;
    let groups: ValveGroups = if is_json(path) {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    validate_groups(&groups)?;
    Ok(groups)
}

pub fn save_groups(path: &Path, groups: &ValveGroups) -> ProjectResult<()> {
    validate_groups(groups)?;
    let content = if is_json(path) {
        serde_json::to_string_pretty(groups)?
    } else {
        serde_yaml::to_string(groups)?
    };
    std::fs::write(path, content)?;
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
