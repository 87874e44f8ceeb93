//! Error types for Overseer
//!
//! Only failures that stop the caller live here. Per-tool failures
//! (resolution, timeout, spawn) are captured into the `ExecutionResult`
//! instead and never cross a batch boundary.

use thiserror::Error;

/// Main error type for the orchestration engine
#[derive(Error, Debug)]
pub enum OverseerError {
    /// Two tool definitions share a name
    #[error("Configuration error: duplicate tool name '{name}'")]
    DuplicateTool { name: String },

    /// A single tool definition failed validation
    #[error("Configuration error: invalid definition for tool '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Unknown tool name passed to a single-tool run
    #[error("Tool '{name}' not found")]
    NotFound { name: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A single-tool run was cancelled before it produced a result
    #[error("Tool '{name}' was interrupted")]
    Interrupted { name: String },
}

impl OverseerError {
    /// True for the error kinds that are fatal at registry construction
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OverseerError::DuplicateTool { .. }
                | OverseerError::InvalidDefinition { .. }
                | OverseerError::ConfigError(_)
        )
    }
}

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, OverseerError>;
