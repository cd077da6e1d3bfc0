//! # gridcall-client
//!
//! Typed client for the gridcall broker. Submit opaque compute calls,
//! then poll for their outcomes with bounded exponential backoff; many
//! submissions and polls may be in flight on one connection at once.
//!
//! ```no_run
//! use gridcall_client::{Connection, RedundancyOptions, TaskOutcome, TaskSpec};
//!
//! # async fn example() -> gridcall_client::ClientResult<()> {
//! let conn = Connection::new("http://broker.internal:50051");
//!
//! let spec = TaskSpec::new("abc123", call_spec_blob(), init_blob(), compare_blob())
//!     .with_redundancy(RedundancyOptions::trivial());
//!
//! let task = conn.submit(spec).await?;
//! match task.result().await? {
//!     TaskOutcome::Success(value) => println!("result: {value}"),
//!     TaskOutcome::UserError(message) => eprintln!("your code failed: {message}"),
//!     TaskOutcome::SystemError(message) => eprintln!("infrastructure failed: {message}"),
//! }
//! # Ok(())
//! # }
//! # fn call_spec_blob() -> Vec<u8> { vec![] }
//! # fn init_blob() -> Vec<u8> { vec![] }
//! # fn compare_blob() -> Vec<u8> { vec![] }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod task;

pub use config::{NetworkConfig, PollingConfig};
pub use connection::Connection;
pub use error::{ClientError, ClientResult};
pub use task::{SubmittedTask, TaskOutcome, TaskSpec};

// Re-exported so callers can build redundancy options without depending
// on gridcall-shared directly.
pub use gridcall_shared::proto::v1::RedundancyOptions;
pub use gridcall_shared::redundancy::RedundancySpec;
