//! # Client Error Types
//!
//! Errors surfaced by the gridcall client library. Remote task failures
//! are NOT errors — they come back as [`TaskOutcome`](crate::TaskOutcome)
//! values; this type covers transport, protocol, and input problems.

use thiserror::Error;

use gridcall_shared::redundancy::RedundancyError;

/// Client operation result type
pub type ClientResult<T> = Result<T, ClientError>;

/// Error types for client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    #[error("RPC failed: {0}")]
    RpcError(#[from] tonic::Status),

    #[error("JSON serialization/deserialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid redundancy spec: {0}")]
    RedundancyError(#[from] RedundancyError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid response: {field} - {reason}")]
    InvalidResponse { field: String, reason: String },
}

impl ClientError {
    /// Create an invalid response error for protocol violations
    ///
    /// Use this when a gRPC response contains malformed data, such as an
    /// unknown status tag or a SUCCESS payload that is not UTF-8 JSON.
    pub fn invalid_response(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is recoverable (worth retrying)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::TransportError(_) => true,
            ClientError::RpcError(status) => matches!(
                status.code(),
                tonic::Code::Unavailable | tonic::Code::DeadlineExceeded
            ),
            // Protocol violations are not recoverable - the server is broken
            ClientError::InvalidResponse { .. } => false,
            _ => false,
        }
    }
}
