//! Generated Protocol Buffer types for the gridcall task service.
//!
//! The `v1` module is produced by `tonic-prost-build` from
//! `proto/gridcall/v1/task_service.proto`. Server code lives under
//! `v1::task_service_server`, client code under `v1::task_service_client`.

pub mod v1 {
    include!(concat!(env!("OUT_DIR"), "/gridcall.v1.rs"));
}
