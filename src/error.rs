//! Error types for minibrain.
//!
//! Every failure in the core aborts the current step and is surfaced to
//! the outer driver unchanged — nothing is retried and no synthetic
//! error turn is ever appended to the conversation history. Only the
//! binary entry point translates errors into human-facing output.

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BrainError>;

/// All error kinds produced by the agent core.
#[derive(Debug, Error)]
pub enum BrainError {
    /// A tool with the same name is already registered.
    #[error("tool with name {0:?} already exists")]
    DuplicateTool(String),

    /// A remote tool schema could not be normalized into a descriptor.
    #[error("schema violation: {0}")]
    Schema(String),

    /// The model requested a tool that is not in the registry.
    #[error("called non-existent tool {0:?}")]
    UnknownTool(String),

    /// A tool rejected its arguments (missing, mistyped, or out of range).
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The model backend or a remote tool provider returned a protocol failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// The operator supplied input that fails validation (e.g. empty prompt).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The shared cancellation context was cancelled mid-step.
    #[error("operation cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_tool_display() {
        let err = BrainError::DuplicateTool("web_search".into());
        assert_eq!(err.to_string(), "tool with name \"web_search\" already exists");
    }

    #[test]
    fn test_unknown_tool_display() {
        let err = BrainError::UnknownTool("magic_wand".into());
        assert!(err.to_string().contains("magic_wand"));
        assert!(err.to_string().contains("non-existent"));
    }

    #[test]
    fn test_schema_violation_display() {
        let err = BrainError::Schema("enum must be string, but got 42".into());
        assert!(err.to_string().starts_with("schema violation"));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BrainError = io.into();
        assert!(matches!(err, BrainError::Io(_)));
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(BrainError::Cancelled.to_string(), "operation cancelled");
    }
}
