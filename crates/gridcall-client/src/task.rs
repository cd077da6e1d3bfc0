//! # Task Handles
//!
//! `TaskSpec` describes one opaque compute call; `SubmittedTask` is the
//! handle returned by submission, whose `result()` polls with bounded
//! exponential backoff until the broker reports a terminal outcome.
//!
//! Remote failures are values, not errors: `result()` returns a
//! `TaskOutcome` so batch callers can tell data from failure per task.

use tracing::warn;

use gridcall_shared::proto::v1::{PollTaskResponse, RedundancyOptions, ResultStatus, TaskStatus};
use gridcall_shared::redundancy::RedundancySpec;

use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};

/// One opaque compute call, ready for submission.
///
/// The broker never inspects `call_spec` or the predicate blobs; the
/// `flavor` tag names the worker runtime variant able to deserialize
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub flavor: String,
    pub call_spec: Vec<u8>,
    pub init_valid_func: Vec<u8>,
    pub compare_valid_func: Vec<u8>,
    pub redundancy: RedundancyOptions,
}

impl TaskSpec {
    /// Build a spec with classic redundancy (quorum of 2 out of 3).
    pub fn new(
        flavor: impl Into<String>,
        call_spec: impl Into<Vec<u8>>,
        init_valid_func: impl Into<Vec<u8>>,
        compare_valid_func: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            flavor: flavor.into(),
            call_spec: call_spec.into(),
            init_valid_func: init_valid_func.into(),
            compare_valid_func: compare_valid_func.into(),
            redundancy: RedundancyOptions::classic(),
        }
    }

    /// Replace the redundancy options with an already complete set.
    pub fn with_redundancy(mut self, redundancy: RedundancyOptions) -> Self {
        self.redundancy = redundancy;
        self
    }

    /// Normalize a partial redundancy spec and use the result.
    pub fn with_redundancy_spec(mut self, spec: RedundancySpec) -> ClientResult<Self> {
        self.redundancy = spec.normalize()?;
        Ok(self)
    }
}

/// Terminal outcome of a task, as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The canonical result, decoded from its UTF-8 JSON payload.
    Success(serde_json::Value),
    /// The fault is attributed to the caller's code; retrying the same
    /// call cannot help.
    UserError(String),
    /// Infrastructure fault: VCH, store, launch, or polling timeout.
    SystemError(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }

    /// The JSON value for a successful outcome.
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            TaskOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The diagnostic for either error outcome.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            TaskOutcome::UserError(message) | TaskOutcome::SystemError(message) => Some(message),
            TaskOutcome::Success(_) => None,
        }
    }
}

/// Handle to a task the broker has acknowledged.
#[derive(Debug)]
pub struct SubmittedTask<'a> {
    connection: &'a Connection,
    task_id: String,
}

impl<'a> SubmittedTask<'a> {
    pub(crate) fn new(connection: &'a Connection, task_id: String) -> Self {
        Self {
            connection,
            task_id,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Poll until the task finishes or the attempt budget is exhausted.
    ///
    /// `found = false` and transport failures both count as attempts and
    /// keep the loop going: the VCH may simply not have assimilated yet.
    /// Exhaustion is a SYSTEM_ERROR value, not an `Err` — the work may
    /// still complete on the grid, the client just stops waiting.
    pub async fn result(&self) -> ClientResult<TaskOutcome> {
        let polling = self.connection.config().polling.clone();
        let mut delay = polling.initial_delay;
        let mut attempts = 0u32;

        while attempts < polling.max_attempts {
            match self.connection.poll_task(&self.task_id).await {
                Err(e) => {
                    warn!(task_id = %self.task_id, error = %e, "Poll attempt failed");
                }
                Ok(response) if !response.found => {
                    warn!(task_id = %self.task_id, "Task not found on the server");
                }
                Ok(response) if response.task_status == TaskStatus::Finished as i32 => {
                    return finished_outcome(&response);
                }
                Ok(_) => {} // still RUNNING
            }

            tokio::time::sleep(delay).await;
            delay = polling.next_delay(delay);
            attempts += 1;
        }

        Ok(TaskOutcome::SystemError(format!(
            "Task polling timed out after {attempts} attempts"
        )))
    }
}

/// Materialize the typed outcome of a FINISHED poll response.
fn finished_outcome(response: &PollTaskResponse) -> ClientResult<TaskOutcome> {
    match ResultStatus::try_from(response.result_status) {
        Ok(ResultStatus::Success) => {
            let value = serde_json::from_slice(&response.returned).map_err(|e| {
                ClientError::invalid_response("returned", format!("not a UTF-8 JSON payload: {e}"))
            })?;
            Ok(TaskOutcome::Success(value))
        }
        Ok(ResultStatus::UserError) => Ok(TaskOutcome::UserError(response.error_message.clone())),
        Ok(ResultStatus::SystemError) => {
            Ok(TaskOutcome::SystemError(response.error_message.clone()))
        }
        Err(_) => Err(ClientError::invalid_response(
            "result_status",
            format!("unknown status tag {}", response.result_status),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finished(result_status: ResultStatus, returned: &[u8], error_message: &str) -> PollTaskResponse {
        PollTaskResponse {
            found: true,
            task_status: TaskStatus::Finished as i32,
            result_status: result_status as i32,
            returned: returned.to_vec(),
            error_message: error_message.to_string(),
        }
    }

    // ---- finished_outcome ----

    #[test]
    fn test_success_decodes_json_payload() {
        let outcome = finished_outcome(&finished(ResultStatus::Success, b"42", "")).unwrap();
        assert_eq!(outcome, TaskOutcome::Success(json!(42)));
    }

    #[test]
    fn test_success_decodes_document_payload() {
        let outcome = finished_outcome(&finished(
            ResultStatus::Success,
            b"{\"loss\": 1.5, \"grads\": [0.1, 0.2]}",
            "",
        ))
        .unwrap();
        assert_eq!(
            outcome,
            TaskOutcome::Success(json!({"loss": 1.5, "grads": [0.1, 0.2]}))
        );
    }

    #[test]
    fn test_user_error_carries_message() {
        let outcome =
            finished_outcome(&finished(ResultStatus::UserError, b"", "ZeroDivisionError")).unwrap();
        assert_eq!(outcome, TaskOutcome::UserError("ZeroDivisionError".to_string()));
    }

    #[test]
    fn test_system_error_carries_message() {
        let outcome =
            finished_outcome(&finished(ResultStatus::SystemError, b"", "VCH error code: 4"))
                .unwrap();
        assert_eq!(outcome, TaskOutcome::SystemError("VCH error code: 4".to_string()));
    }

    #[test]
    fn test_malformed_success_payload_is_protocol_violation() {
        let err = finished_outcome(&finished(ResultStatus::Success, b"not json", "")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse { .. }));
    }

    #[test]
    fn test_unknown_status_tag_is_protocol_violation() {
        let mut response = finished(ResultStatus::Success, b"42", "");
        response.result_status = 7;
        let err = finished_outcome(&response).unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse { .. }));
    }

    // ---- TaskOutcome helpers ----

    #[test]
    fn test_outcome_accessors() {
        let success = TaskOutcome::Success(json!(1.0));
        assert!(success.is_success());
        assert_eq!(success.value(), Some(&json!(1.0)));
        assert_eq!(success.error_message(), None);

        let failure = TaskOutcome::UserError("bad shape".to_string());
        assert!(!failure.is_success());
        assert_eq!(failure.value(), None);
        assert_eq!(failure.error_message(), Some("bad shape"));
    }

    // ---- TaskSpec ----

    #[test]
    fn test_task_spec_defaults_to_classic_redundancy() {
        let spec = TaskSpec::new("abc123", b"call".to_vec(), b"init".to_vec(), b"cmp".to_vec());
        assert_eq!(spec.redundancy, RedundancyOptions::classic());
    }

    #[test]
    fn test_task_spec_with_trivial_redundancy() {
        let spec = TaskSpec::new("abc123", b"call".to_vec(), b"init".to_vec(), b"cmp".to_vec())
            .with_redundancy(RedundancyOptions::trivial());
        assert_eq!(spec.redundancy.min_quorum, 1);
        assert_eq!(spec.redundancy.max_total_results, 1);
    }

    #[test]
    fn test_task_spec_with_partial_redundancy_spec() {
        let spec = TaskSpec::new("abc123", b"call".to_vec(), b"init".to_vec(), b"cmp".to_vec())
            .with_redundancy_spec(RedundancySpec {
                min_quorum: Some(3),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(spec.redundancy.min_quorum, 3);
        assert_eq!(spec.redundancy.target_nresults, 3);
    }

    #[test]
    fn test_task_spec_rejects_bad_redundancy_spec() {
        let err = TaskSpec::new("abc123", b"call".to_vec(), b"init".to_vec(), b"cmp".to_vec())
            .with_redundancy_spec(RedundancySpec {
                min_quorum: Some(3),
                target_nresults: Some(2),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ClientError::RedundancyError(_)));
    }
}
