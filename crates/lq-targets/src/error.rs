//! Error types for platform backend selection.

/// Errors that can occur while selecting or running a platform backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// The requested platform is not one of the built-in backends.
    #[error("unknown platform: {name} (supported: {supported})")]
    UnknownPlatform {
        /// The name as given on the command line or in `lqc.toml`.
        name: String,
        /// Comma-separated list of accepted names.
        supported: String,
    },
}

/// Result type for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;
