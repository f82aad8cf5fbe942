use thiserror::Error;

use crate::value::Shape;

pub type BlockResult<T> = Result<T, BlockError>;

/// Errors raised by block implementations.
///
/// The engine wraps these with diagram context (block label, step, time)
/// before surfacing them to callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    /// Block parameters are inconsistent (reported by `check()`).
    #[error("Configuration error: {what}")]
    Config { what: String },

    /// A computation failed on otherwise valid data.
    #[error("Computation error: {what}")]
    Computation { what: String },

    #[error("Shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: Shape,
        found: Shape,
    },

    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

impl BlockError {
    pub fn config(what: impl Into<String>) -> Self {
        Self::Config { what: what.into() }
    }

    pub fn computation(what: impl Into<String>) -> Self {
        Self::Computation { what: what.into() }
    }
}
