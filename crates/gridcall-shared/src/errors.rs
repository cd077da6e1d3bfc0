//! # Broker Error Types
//!
//! Unified error handling for the gridcall server components. Client-side
//! errors live in `gridcall-client`; this type covers the store, the work
//! launcher, and the gateway/daemon processes.

use thiserror::Error;

use crate::codec::CodecError;

/// Broker operation result type
pub type GridcallResult<T> = Result<T, GridcallError>;

/// Error taxonomy for the server-side components
#[derive(Debug, Error)]
pub enum GridcallError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Work launch failed: {0}")]
    LaunchError(String),

    #[error("Corrupt result file: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("No workunit found with id {wu_id}")]
    WorkunitNotFound { wu_id: i64 },

    #[error("No result found with id {result_id}")]
    ResultNotFound { result_id: i64 },

    #[error("No {mode} validation function found for task {task_id}")]
    ValidationFuncNotFound { task_id: String, mode: &'static str },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GridcallError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError(message.into())
    }

    /// Create a launch error
    pub fn launch_error(message: impl Into<String>) -> Self {
        Self::LaunchError(message.into())
    }

    /// True for faults the VCH may usefully retry (transient infrastructure),
    /// false for deterministic failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GridcallError::DatabaseError(_) | GridcallError::IoError(_)
        )
    }
}
