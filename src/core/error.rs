//! Domain errors raised by the allocation model and drift engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AllocationError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    /// One entry per internal node whose children do not sum to 1.0.
    #[error("Allocation weights are invalid:\n{}", .0.join("\n"))]
    WeightSumMismatch(Vec<String>),

    #[error("Allocations must sum to 1.0, current allocation = {sum}")]
    InvalidTargetAllocation { sum: f64 },

    #[error("Total investable value is zero, allocation fractions are undefined")]
    DivisionByZero,

    #[error("No collected weight for leaf '{0}', taxonomy depth does not match the export depth")]
    MissingWeight(String),

    #[error("Leaf '{0}' has no parent category")]
    MissingParent(String),
}
