//! # Assimilator
//!
//! One-shot process the VCH invokes once a work unit has a canonical
//! result (success shape) or has failed terminally (error shape).
//! Records the outcome in the store and exits; the exit code is the only
//! liveness signal, and the VCH drives any re-invocation. The FINISHED
//! transition is guarded in the store, so a repeat invocation after a
//! partial failure cannot overwrite a terminal record.

use std::path::PathBuf;

use tracing::{error, info};

use gridcall_shared::codec;
use gridcall_shared::proto::v1::ResultStatus;
use gridcall_shared::{GridcallError, GridcallResult};

use crate::store::TaskStore;

/// Interpreted invocation, one of the VCH's two argument shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssimilateArgs {
    /// `<bin> <wu_id> <result_file>` — a canonical result exists.
    Success { wu_id: i64, result_file: PathBuf },
    /// `<bin> --error <error_code> <wu_name> <wu_id> <runtime>` — the
    /// work unit failed terminally at the VCH level.
    Error {
        error_code: i64,
        wu_name: String,
        wu_id: i64,
    },
}

impl AssimilateArgs {
    /// Interpret the raw CLI surface: an optional `--error <code>` flag
    /// plus positional operands whose meaning depends on the shape.
    pub fn interpret(error_code: Option<i64>, operands: &[String]) -> Result<Self, String> {
        match error_code {
            None => {
                if operands.len() != 2 {
                    return Err(format!(
                        "success shape requires exactly 2 arguments (wu_id, result_file), got {}",
                        operands.len()
                    ));
                }
                let wu_id = operands[0]
                    .parse()
                    .map_err(|_| format!("invalid wu_id '{}'", operands[0]))?;
                Ok(AssimilateArgs::Success {
                    wu_id,
                    result_file: PathBuf::from(&operands[1]),
                })
            }
            Some(error_code) => {
                if operands.len() != 3 {
                    return Err(format!(
                        "error shape requires exactly 3 arguments (wu_name, wu_id, runtime), got {}",
                        operands.len()
                    ));
                }
                let wu_id = operands[1]
                    .parse()
                    .map_err(|_| format!("invalid wu_id '{}'", operands[1]))?;
                // The trailing runtime operand is accepted and ignored.
                Ok(AssimilateArgs::Error {
                    error_code,
                    wu_name: operands[0].clone(),
                    wu_id,
                })
            }
        }
    }

    pub fn wu_id(&self) -> i64 {
        match self {
            AssimilateArgs::Success { wu_id, .. } | AssimilateArgs::Error { wu_id, .. } => *wu_id,
        }
    }
}

/// Diagnostic recorded for a VCH-terminal work-unit failure.
pub fn vch_error_message(error_code: i64) -> String {
    format!("VCH error code: {error_code}, see WU_ERROR_* in common_defs")
}

/// Record the terminal outcome for one work unit. Never retries; any
/// failure propagates so the process exits non-zero and the VCH decides.
pub async fn run(store: &TaskStore, args: AssimilateArgs) -> GridcallResult<()> {
    let wu_id = args.wu_id();
    let task_id = store
        .get_task_id_for_workunit(wu_id)
        .await?
        .ok_or(GridcallError::WorkunitNotFound { wu_id })?;

    let updated = match &args {
        AssimilateArgs::Error { error_code, .. } => {
            let message = vch_error_message(*error_code);
            error!(task_id, wu_id, message, "Work unit failed at the VCH");
            store
                .set_task_finished(&task_id, ResultStatus::SystemError, None, Some(&message))
                .await?
        }
        AssimilateArgs::Success { result_file, .. } => {
            let bytes = tokio::fs::read(result_file).await.map_err(|e| {
                GridcallError::Internal(format!(
                    "failed to read result file {}: {e}",
                    result_file.display()
                ))
            })?;
            let (status, payload) = codec::decode(&bytes)?;

            if status == ResultStatus::Success {
                // The stored value is the payload alone; the status digit
                // never leaves the file format.
                store
                    .set_task_finished(&task_id, status, Some(payload), None)
                    .await?
            } else {
                let message = String::from_utf8_lossy(payload);
                store
                    .set_task_finished(&task_id, status, None, Some(&message))
                    .await?
            }
        }
    };

    if !updated {
        return Err(GridcallError::TaskNotFound { task_id });
    }

    info!(wu_id, task_id, "Assimilated work unit");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operands(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    // ---- success shape ----

    #[test]
    fn test_interpret_success_shape() {
        let args = AssimilateArgs::interpret(None, &operands(&["17", "/tmp/result"])).unwrap();
        assert_eq!(
            args,
            AssimilateArgs::Success {
                wu_id: 17,
                result_file: PathBuf::from("/tmp/result"),
            }
        );
        assert_eq!(args.wu_id(), 17);
    }

    #[test]
    fn test_interpret_success_shape_wrong_arity() {
        let err = AssimilateArgs::interpret(None, &operands(&["17"])).unwrap_err();
        assert!(err.contains("exactly 2 arguments"));

        let err =
            AssimilateArgs::interpret(None, &operands(&["17", "/tmp/result", "extra"])).unwrap_err();
        assert!(err.contains("exactly 2 arguments"));
    }

    #[test]
    fn test_interpret_success_shape_bad_wu_id() {
        let err = AssimilateArgs::interpret(None, &operands(&["seventeen", "/tmp/result"]))
            .unwrap_err();
        assert!(err.contains("invalid wu_id"));
    }

    // ---- error shape ----

    #[test]
    fn test_interpret_error_shape() {
        let args =
            AssimilateArgs::interpret(Some(4), &operands(&["deadbeef", "17", "12.5"])).unwrap();
        assert_eq!(
            args,
            AssimilateArgs::Error {
                error_code: 4,
                wu_name: "deadbeef".to_string(),
                wu_id: 17,
            }
        );
        assert_eq!(args.wu_id(), 17);
    }

    #[test]
    fn test_interpret_error_shape_wrong_arity() {
        let err = AssimilateArgs::interpret(Some(4), &operands(&["deadbeef", "17"])).unwrap_err();
        assert!(err.contains("exactly 3 arguments"));
    }

    #[test]
    fn test_interpret_error_shape_bad_wu_id() {
        let err = AssimilateArgs::interpret(Some(4), &operands(&["deadbeef", "x", "12.5"]))
            .unwrap_err();
        assert!(err.contains("invalid wu_id"));
    }

    // ---- diagnostics ----

    #[test]
    fn test_vch_error_message_shape() {
        assert_eq!(
            vch_error_message(4),
            "VCH error code: 4, see WU_ERROR_* in common_defs"
        );
    }
}
