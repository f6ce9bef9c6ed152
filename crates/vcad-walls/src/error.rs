//! Error types for wall generation.

use thiserror::Error;

/// Errors surfaced to callers of wall generation.
///
/// Only structurally invalid parameters are errors. Degenerate outlines
/// produce empty output and graph inconsistencies are logged and skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WallError {
    /// Invalid wall settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A beading strategy was constructed with invalid parameters.
    #[error("invalid beading strategy: {0}")]
    InvalidStrategy(String),

    /// A strategy tried to wrap a step that must stay outermost.
    #[error("{wrapper} cannot wrap {parent}: bead count limiting must be the outermost step")]
    TerminalParent {
        /// Name of the wrapping strategy.
        wrapper: &'static str,
        /// Description of the wrapped chain.
        parent: String,
    },
}

/// Result type for wall generation.
pub type Result<T> = std::result::Result<T, WallError>;
