//! Error type shared by every plot builder.

use thiserror::Error;

/// Failures surfaced to the caller. Every variant is raised before any
/// figure is built, so a failed call never returns a partial plot.
#[derive(Debug, Error)]
pub enum BctoolsError {
    /// A parameter value is out of its domain (step, beta, labels, ...).
    #[error("invalid value: {0}")]
    Value(String),

    /// Two inputs that must be aligned have different lengths.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A required combination of optional inputs is missing.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("table error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BctoolsError {
    pub fn value(message: impl Into<String>) -> Self {
        Self::Value(message.into())
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn shape(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::Shape {
            what: what.into(),
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, BctoolsError>;
