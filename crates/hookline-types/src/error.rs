use thiserror::Error;

use crate::job::{JobId, JobStatus};

/// Errors returned synchronously by job registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job {id} is {status}: {reason}")]
    InvalidState {
        id: JobId,
        status: JobStatus,
        reason: String,
    },
}

/// Errors related to tools and the operations they run.
///
/// `InvalidInput` and `UnknownTool` are raised before a job exists; the
/// remaining variants describe how a running operation ended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("no tool named '{0}' is registered")]
    UnknownTool(String),

    #[error("a tool named '{0}' is already registered")]
    DuplicateTool(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("operation was cancelled")]
    Cancelled,
}

impl ToolError {
    /// Shorthand for an execution failure with a human-readable message.
    pub fn failed(message: impl Into<String>) -> Self {
        ToolError::ExecutionFailed(message.into())
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
