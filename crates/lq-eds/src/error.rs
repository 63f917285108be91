//! Error and warning types for object-dictionary import.

use std::fmt;
use std::path::PathBuf;

/// Errors reading an EDS file.
#[derive(Debug, thiserror::Error)]
pub enum EdsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line that is neither a section header, a key/value pair nor a comment.
    #[error("line {line}: expected '[section]' or 'Key=Value', found '{text}'")]
    MalformedLine { line: usize, text: String },

    /// A numeric field that could not be read.
    #[error("[{section}] {key}: invalid number '{value}'")]
    InvalidNumber {
        section: String,
        key: String,
        value: String,
    },

    /// A key/value pair before any section header.
    #[error("line {line}: key outside of any section")]
    KeyOutsideSection { line: usize },
}

/// Result type for EDS reading.
pub type Result<T> = std::result::Result<T, EdsError>;

/// A non-fatal import problem. The stub it refers to is left unexpanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// Label or name of the stub node.
    pub stub: String,
    /// The EDS path as resolved against the description's directory.
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: EDS file {} not imported ({}); stub left unexpanded",
            self.stub,
            self.path.display(),
            self.reason
        )
    }
}
