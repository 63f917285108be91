//! Resolution error types.

/// Errors that abort resolution. No artifacts are produced after any of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A reference names a label no node declares.
    #[error("unknown label '&{label}' referenced by '{referenced_by}' (property '{property}')")]
    UnknownLabel {
        label: String,
        referenced_by: String,
        property: String,
    },

    /// A reference names a node that owns no signal.
    #[error("'&{label}' referenced by '{referenced_by}' (property '{property}') does not produce a signal")]
    NotASignal {
        label: String,
        referenced_by: String,
        property: String,
    },

    /// A limp-home target that is not a scale block.
    #[error("'&{label}' referenced by '{referenced_by}' as a limp target is not a scale block")]
    NotAScale { label: String, referenced_by: String },

    /// Two producers declare the same explicit identity.
    #[error("signal {id} is declared by both '{first}' and '{second}'")]
    DuplicateSignal {
        id: u32,
        first: String,
        second: String,
    },

    /// An identity past the largest the engine can count.
    #[error("'{node}': signal identity {id} is past the limit of {max}")]
    IdentityOverflow { node: String, id: u64, max: u32 },

    /// Two nodes declare the same label.
    #[error("label '{label}' is declared more than once")]
    DuplicateLabel { label: String },

    /// A property whose value has the wrong shape.
    #[error("'{node}': property '{property}' must be {expected}, found {found}")]
    WrongPropertyType {
        node: String,
        property: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Result type for resolution.
pub type Result<T> = std::result::Result<T, ResolveError>;
