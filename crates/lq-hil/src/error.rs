//! HIL compilation errors.

use lq_dts::ParseError;
use thiserror::Error;

/// Errors that stop a test description from becoming a harness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HilError {
    #[error("{test}: step {step} has no action")]
    MissingAction { test: String, step: String },

    #[error("{test}: step {step}: unknown action '{action}'")]
    UnknownAction {
        test: String,
        step: String,
        action: String,
    },

    /// A step whose properties cannot be turned into a harness call.
    #[error("{test}: step {step}: {detail}")]
    InvalidStep {
        test: String,
        step: String,
        detail: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Result type for HIL compilation.
pub type Result<T> = std::result::Result<T, HilError>;
