//! # Task Gateway
//!
//! Client-facing gRPC service. CreateTask runs the strictly ordered
//! insert -> launch -> (compensating mark-failed) sequence that makes the
//! store the sole authority on task existence; PollTask is a pure read.
//!
//! The sequence is deliberately not a transaction: a crash between the
//! insert and the launch leaves a durable RUNNING row with no work unit,
//! which stays pollable until the client's own attempt budget expires.

use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

use gridcall_shared::proto::v1::task_service_server::{TaskService, TaskServiceServer};
use gridcall_shared::proto::v1::{
    CreateTaskRequest, CreateTaskResponse, PollTaskRequest, PollTaskResponse, RedundancyOptions,
};
use gridcall_shared::{new_task_id, GRPC_MAX_MESSAGE_BYTES};

use crate::launcher::WorkLauncher;
use crate::store::{TaskRecord, TaskStore};

/// gRPC task service implementation.
#[derive(Debug)]
pub struct TaskServiceImpl {
    store: TaskStore,
    launcher: WorkLauncher,
}

impl TaskServiceImpl {
    pub fn new(store: TaskStore, launcher: WorkLauncher) -> Self {
        Self { store, launcher }
    }

    /// Wrap into a tonic server with the 1 GiB message limits applied in
    /// both directions; call specs and predicate blobs can be heavy.
    pub fn into_server(self) -> TaskServiceServer<Self> {
        TaskServiceServer::new(self)
            .max_decoding_message_size(GRPC_MAX_MESSAGE_BYTES)
            .max_encoding_message_size(GRPC_MAX_MESSAGE_BYTES)
    }
}

#[tonic::async_trait]
impl TaskService for TaskServiceImpl {
    async fn create_task(
        &self,
        request: Request<CreateTaskRequest>,
    ) -> Result<Response<CreateTaskResponse>, Status> {
        let req = request.into_inner();
        let task_id = new_task_id();
        info!(
            task_id,
            flavor = %req.flavor,
            call_spec_bytes = req.call_spec.len(),
            "CreateTask request"
        );

        // Insert first: if the launch below fails, the row is marked
        // SYSTEM_ERROR so a stray poll converges; if the insert fails,
        // there is no VCH work to clean up.
        if let Err(e) = self
            .store
            .create_task(
                &task_id,
                &req.call_spec,
                &req.init_valid_func,
                &req.compare_valid_func,
            )
            .await
        {
            error!(task_id, error = %e, "Failed to create task in store");
            return Err(Status::internal(e.to_string()));
        }

        let redundancy = req
            .redundancy_options
            .unwrap_or_else(RedundancyOptions::classic);

        if let Err(e) = self
            .launcher
            .create_work(&task_id, &req.flavor, &req.call_spec, &redundancy)
            .await
        {
            error!(task_id, error = %e, "Failed to register work unit");
            // Best-effort: the client also receives the RPC error.
            self.store.set_task_failed(&task_id, &e.to_string()).await;
            return Err(Status::internal(e.to_string()));
        }

        info!(task_id, "Work unit registered");
        Ok(Response::new(CreateTaskResponse { task_id }))
    }

    async fn poll_task(
        &self,
        request: Request<PollTaskRequest>,
    ) -> Result<Response<PollTaskResponse>, Status> {
        let req = request.into_inner();
        debug!(task_id = %req.task_id, "PollTask request");

        let record = self
            .store
            .get_task_status(&req.task_id)
            .await
            .map_err(|e| {
                error!(task_id = %req.task_id, error = %e, "Failed to read task status");
                Status::internal(e.to_string())
            })?;

        Ok(Response::new(poll_response(record)))
    }
}

/// Assemble the poll response, substituting 0/empty for unset nullable
/// columns. An unknown task is a successful RPC with `found = false` so
/// clients can tell "not yet visible" from transport failure.
fn poll_response(record: Option<TaskRecord>) -> PollTaskResponse {
    match record {
        None => PollTaskResponse {
            found: false,
            ..Default::default()
        },
        Some(row) => PollTaskResponse {
            found: true,
            task_status: row.task_status,
            result_status: row.result_status.unwrap_or(0),
            returned: row.returned.unwrap_or_default(),
            error_message: row.error_message.unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcall_shared::proto::v1::{ResultStatus, TaskStatus};

    fn record(
        task_status: TaskStatus,
        result_status: Option<ResultStatus>,
        returned: Option<&[u8]>,
        error_message: Option<&str>,
    ) -> TaskRecord {
        TaskRecord {
            task_id: "deadbeef".to_string(),
            task_status: task_status as i32,
            result_status: result_status.map(|s| s as i32),
            returned: returned.map(|b| b.to_vec()),
            error_message: error_message.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_poll_response_not_found() {
        let resp = poll_response(None);
        assert!(!resp.found);
        assert_eq!(resp.task_status, 0);
        assert_eq!(resp.result_status, 0);
        assert!(resp.returned.is_empty());
        assert!(resp.error_message.is_empty());
    }

    #[test]
    fn test_poll_response_running_row_has_empty_fields() {
        let resp = poll_response(Some(record(TaskStatus::Running, None, None, None)));
        assert!(resp.found);
        assert_eq!(resp.task_status, TaskStatus::Running as i32);
        assert_eq!(resp.result_status, 0);
        assert!(resp.returned.is_empty());
        assert!(resp.error_message.is_empty());
    }

    #[test]
    fn test_poll_response_success_row() {
        let resp = poll_response(Some(record(
            TaskStatus::Finished,
            Some(ResultStatus::Success),
            Some(b"42"),
            None,
        )));
        assert!(resp.found);
        assert_eq!(resp.task_status, TaskStatus::Finished as i32);
        assert_eq!(resp.result_status, ResultStatus::Success as i32);
        assert_eq!(resp.returned, b"42");
        assert!(resp.error_message.is_empty());
    }

    #[test]
    fn test_poll_response_error_row() {
        let resp = poll_response(Some(record(
            TaskStatus::Finished,
            Some(ResultStatus::UserError),
            None,
            Some("ZeroDivisionError"),
        )));
        assert!(resp.found);
        assert_eq!(resp.result_status, ResultStatus::UserError as i32);
        assert!(resp.returned.is_empty());
        assert_eq!(resp.error_message, "ZeroDivisionError");
    }
}
