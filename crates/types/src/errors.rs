//! Error types for pipeline specifications

use thiserror::Error;

/// Result type alias for specification handling
pub type Result<T> = std::result::Result<T, SpecError>;

/// Errors raised while reading a pipeline specification
#[derive(Error, Debug)]
pub enum SpecError {
    /// The document is not a well-formed pipeline specification
    #[error("malformed pipeline specification: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A component descriptor has no type tag
    #[error("{section} is missing 'type'")]
    MissingType { section: String },
}
