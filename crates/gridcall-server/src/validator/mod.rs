//! # Validator
//!
//! One-shot process the VCH invokes for initial and comparative result
//! validation. Carries the whole trust model: a result becomes canonical
//! only if it survives the user's predicates under the exit-code
//! discipline below. Everything here is expressed as pure decision
//! functions plus a thin orchestration layer so the decisions are
//! deterministic and testable without processes or a database.

pub mod predicate;

use std::path::Path;

use tracing::{info, warn};

use gridcall_shared::codec;
use gridcall_shared::proto::v1::ResultStatus;
use gridcall_shared::{GridcallResult, ValidationMode};

use crate::store::TaskStore;
use predicate::{PredicateCheck, PredicateOutcome, PredicateRuntime};

/// Exit codes the VCH understands for scripted validators. The process
/// exit status is the entire liveness contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Result approved.
    Accepted = 0,
    /// Result rejected.
    Rejected = 1,
    /// Internal failure; no retry, validation failed.
    OtherError = 2,
    /// Transient failure; the VCH retries later.
    TempError = 3,
    /// Fault attributed to the user's predicate; no retry, rejected.
    ValidFuncError = 4,
}

/// Validator invocation, one of the VCH's two argument shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorArgs {
    Init {
        result_id: i64,
        file: std::path::PathBuf,
    },
    Compare {
        result_id_1: i64,
        file_1: std::path::PathBuf,
        result_id_2: i64,
        file_2: std::path::PathBuf,
    },
}

/// Status-only part of the initial decision. `None` means the payload
/// must be put to the unary predicate.
///
/// A well-formed USER_ERROR is itself a valid outcome (it will be
/// compared against the other replicas); a SYSTEM_ERROR is never trusted
/// as canonical.
pub fn initial_status_decision(status: ResultStatus) -> Option<ExitCode> {
    match status {
        ResultStatus::UserError => Some(ExitCode::Accepted),
        ResultStatus::SystemError => Some(ExitCode::Rejected),
        ResultStatus::Success => None,
    }
}

/// Status-pairing part of the comparative decision. `None` means the two
/// payloads must be put to the binary predicate.
pub fn comparative_status_decision(
    status_1: ResultStatus,
    status_2: ResultStatus,
) -> Option<ExitCode> {
    let user_errors = [status_1, status_2]
        .iter()
        .filter(|s| **s == ResultStatus::UserError)
        .count();
    match user_errors {
        2 => Some(ExitCode::Accepted), // equal failures agree
        1 => Some(ExitCode::Rejected), // a failure never equals a value
        _ => None,
    }
}

/// Map a predicate evaluation onto the exit-code table.
pub fn predicate_exit_code(outcome: &PredicateOutcome) -> ExitCode {
    match outcome {
        PredicateOutcome::Verdict(true) => ExitCode::Accepted,
        PredicateOutcome::Verdict(false) => ExitCode::Rejected,
        PredicateOutcome::Fault(message) => {
            info!(fault = %message, "Predicate fault");
            ExitCode::ValidFuncError
        }
    }
}

/// Read and decode one result file, checking the payload encoding.
///
/// SUCCESS payloads must be valid UTF-8 JSON; error payloads must be
/// UTF-8 text. Any failure is reported as a reason string — the caller
/// rejects the result rather than failing the invocation, because a
/// malformed file from an untrusted worker could be an attack.
async fn read_result_file(path: &Path) -> Result<(ResultStatus, Vec<u8>), String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let (status, payload) =
        codec::decode(&bytes).map_err(|e| format!("{} in {}", e, path.display()))?;

    if status == ResultStatus::Success {
        serde_json::from_slice::<serde_json::Value>(payload)
            .map_err(|e| format!("invalid JSON payload in {}: {e}", path.display()))?;
    } else {
        std::str::from_utf8(payload)
            .map_err(|e| format!("non-UTF-8 diagnostic in {}: {e}", path.display()))?;
    }

    Ok((status, payload.to_vec()))
}

/// Run one validator invocation end to end.
///
/// Both modes follow the same strict order: resolve the task, fetch and
/// deserialize-check the predicate blob (load failure → VALID_FUNC_ERROR
/// before any result file is examined), then decode the file(s), decide
/// on statuses, and only then evaluate the predicate.
///
/// `Err` is an internal failure (store, scratch files) and maps to
/// OTHER_ERROR at the process edge; every user-attributable path comes
/// back as an `ExitCode`.
pub async fn run(
    store: &TaskStore,
    runtime: &PredicateRuntime,
    args: ValidatorArgs,
) -> GridcallResult<ExitCode> {
    match args {
        ValidatorArgs::Init { result_id, file } => {
            let task_id = store.get_task_id_for_result(result_id).await?;
            let predicate = store
                .get_validation_func(&task_id, ValidationMode::Init)
                .await?;

            // The blob must deserialize before the result file is
            // examined; a load failure is the user's fault whatever the
            // result status turns out to be.
            if let PredicateCheck::Fault(message) = runtime.check(&predicate).await? {
                warn!(result_id, task_id, fault = %message, "Predicate blob failed to deserialize");
                return Ok(ExitCode::ValidFuncError);
            }

            let (status, payload) = match read_result_file(&file).await {
                Ok(decoded) => decoded,
                Err(reason) => {
                    warn!(result_id, task_id, reason, "Failed to load result (could be an attack); rejected");
                    return Ok(ExitCode::Rejected);
                }
            };

            if let Some(code) = initial_status_decision(status) {
                info!(
                    result_id,
                    task_id,
                    status = status.as_str_name(),
                    code = code as i32,
                    "Initial validation decided on status alone"
                );
                return Ok(code);
            }

            let outcome = runtime.eval_init(&predicate, &payload).await?;
            let code = predicate_exit_code(&outcome);
            info!(result_id, task_id, code = code as i32, "Initial validation complete");
            Ok(code)
        }
        ValidatorArgs::Compare {
            result_id_1,
            file_1,
            result_id_2,
            file_2,
        } => {
            let task_id = store.get_task_id_for_result(result_id_1).await?;
            let predicate = store
                .get_validation_func(&task_id, ValidationMode::Compare)
                .await?;

            if let PredicateCheck::Fault(message) = runtime.check(&predicate).await? {
                warn!(
                    result_id_1,
                    result_id_2,
                    task_id,
                    fault = %message,
                    "Predicate blob failed to deserialize"
                );
                return Ok(ExitCode::ValidFuncError);
            }

            let (status_1, payload_1) = match read_result_file(&file_1).await {
                Ok(decoded) => decoded,
                Err(reason) => {
                    warn!(result_id = result_id_1, task_id, reason, "Failed to load result (could be an attack); rejected");
                    return Ok(ExitCode::Rejected);
                }
            };
            let (status_2, payload_2) = match read_result_file(&file_2).await {
                Ok(decoded) => decoded,
                Err(reason) => {
                    warn!(result_id = result_id_2, task_id, reason, "Failed to load result (could be an attack); rejected");
                    return Ok(ExitCode::Rejected);
                }
            };

            if let Some(code) = comparative_status_decision(status_1, status_2) {
                info!(
                    result_id_1,
                    result_id_2,
                    task_id,
                    code = code as i32,
                    "Comparative validation decided on statuses alone"
                );
                return Ok(code);
            }

            let outcome = runtime.eval_compare(&predicate, &payload_1, &payload_2).await?;
            let code = predicate_exit_code(&outcome);
            info!(
                result_id_1,
                result_id_2,
                task_id,
                code = code as i32,
                "Comparative validation complete"
            );
            Ok(code)
        }
    }
}
