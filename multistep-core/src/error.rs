//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// All variants are raised at the call boundary before any target is
/// computed, so a failing call never returns partial results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MultistepError {
    /// Sequence arguments disagree in batch size, or a time length does not
    /// follow the indexing convention of the estimator.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// An input is not floating-point where a floating-point sequence is required.
    #[error("Type contract violation: {0}")]
    TypeContract(String),

    /// A parameter is out of its domain, e.g., a zero step count or a mixing
    /// parameter that cannot be broadcast to the target shape.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
