//! # gridcall-server
//!
//! Server-side half of the gridcall broker: the task gateway (online
//! gRPC service), the Postgres-backed task store, the work launcher that
//! registers work units with the VCH, and the two one-shot daemons the
//! VCH invokes at lifecycle points — the validator and the assimilator.
//!
//! The gateway runs forever; the daemons obtain one store connection,
//! commit or roll back, and exit. The store is the only shared mutable
//! resource between them.

pub mod assimilator;
pub mod gateway;
pub mod launcher;
pub mod store;
pub mod validator;
