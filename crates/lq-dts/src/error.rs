//! Parse errors. Every variant carries the byte offset it refers to.

/// Errors produced while reading a description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A `}` without an opening brace, or a `{` that is never closed.
    #[error("unbalanced brace at byte {offset}: {detail}")]
    UnbalancedBrace { offset: usize, detail: &'static str },

    /// A `/*` comment that runs to end of input.
    #[error("unterminated block comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },

    /// A string literal that runs to end of line or input.
    #[error("unterminated string starting at byte {offset}")]
    UnterminatedString { offset: usize },

    /// Structural syntax error.
    #[error("syntax error at byte {offset}: expected {expected}, found {found}")]
    Syntax {
        offset: usize,
        expected: &'static str,
        found: String,
    },

    /// A cell that is neither a valid integer nor a reference.
    #[error("invalid integer '{text}' at byte {offset}")]
    InvalidInteger { offset: usize, text: String },
}

impl ParseError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnbalancedBrace { offset, .. }
            | ParseError::UnterminatedComment { offset }
            | ParseError::UnterminatedString { offset }
            | ParseError::Syntax { offset, .. }
            | ParseError::InvalidInteger { offset, .. } => *offset,
        }
    }
}

/// Result type for description parsing.
pub type Result<T> = std::result::Result<T, ParseError>;
