use thiserror::Error;

pub type WpResult<T> = Result<T, WpError>;

#[derive(Error, Debug)]
pub enum WpError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Element not found: {id}")]
    NotFound { id: String },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
