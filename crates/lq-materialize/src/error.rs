//! Materialization errors.

use std::path::PathBuf;

use lq_targets::TargetError;
use thiserror::Error;

/// Errors that can occur while generating or writing artifacts.
#[derive(Debug, Error)]
pub enum MaterializationError {
    /// A cyclic output declares a protocol family with no dispatch encoding.
    #[error("output '{node}' uses protocol family '{family}', which has no dispatch encoding (supported: can, j1939, canopen, gpio, uart, spi, i2c, pwm, dac, modbus)")]
    UnsupportedOutputFamily { node: String, family: String },

    /// A property value the generator cannot express in C.
    #[error("node '{node}': property '{property}' {detail}")]
    InvalidProperty {
        node: String,
        property: String,
        detail: String,
    },

    /// A value does not fit the engine's field width.
    #[error("node '{node}': {field} = {value} does not fit in {width}")]
    OutOfRange {
        node: String,
        field: &'static str,
        value: i64,
        width: &'static str,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Result type for materialization.
pub type Result<T> = std::result::Result<T, MaterializationError>;
