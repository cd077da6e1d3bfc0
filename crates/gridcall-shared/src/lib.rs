//! # gridcall-shared
//!
//! Wire contract and shared vocabulary for the gridcall broker: the gRPC
//! proto types, the result-file codec, the redundancy policy, status
//! enums, environment configuration, and error types. Both the server
//! components and the client library build on this crate; nothing here
//! touches the database or the VCH.

pub mod codec;
pub mod config;
pub mod errors;
pub mod logging;
pub mod proto;
pub mod redundancy;
pub mod status;

pub use errors::{GridcallError, GridcallResult};
pub use status::ValidationMode;

/// Message-size ceiling for both directions of the task service: call
/// specs and predicate blobs can be heavy, so the default 4 MiB gRPC cap
/// is raised to 1 GiB on client and server alike.
pub const GRPC_MAX_MESSAGE_BYTES: usize = 1024 * 1024 * 1024;

/// Generate a fresh task id: UUID4 as a 32-char lowercase hex string.
/// The same string names the VCH work unit.
pub fn new_task_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
