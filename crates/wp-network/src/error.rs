//! Network-specific error types.

use thiserror::Error;
use wp_core::{ElementId, WpError};

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Network lookup, mutation and validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Element not found: {id}")]
    NotFound { id: ElementId },

    #[error("Duplicate element id: {id}")]
    DuplicateId { id: ElementId },

    #[error("Link {link} refers to non-existent node {node}")]
    InvalidEndpoint { link: ElementId, node: ElementId },

    #[error("Leak {leak} is malformed: {what}")]
    LeakTopology { leak: ElementId, what: &'static str },

    #[error("Attribute {attribute} does not apply to element {id}")]
    AttributeMismatch {
        id: ElementId,
        attribute: &'static str,
    },

    #[error("Leak connector {id} can only be removed together with its leak node")]
    ConnectorRemoval { id: ElementId },

    #[error("Node {id} still has incident links")]
    NodeInUse { id: ElementId },

    #[error("Invalid value: {what}")]
    InvalidValue { what: &'static str },
}

impl From<NetworkError> for WpError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::NotFound { id } => WpError::NotFound { id: id.to_string() },
            other => WpError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
