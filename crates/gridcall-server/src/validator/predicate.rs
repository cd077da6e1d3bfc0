//! Bridge to the co-deployed predicate runtime.
//!
//! Predicate blobs stay opaque to the broker; the only component allowed
//! to deserialize or evaluate them is an interpreter shipped next to the
//! VCH binaries at `<project_dir>/bin/predicate_runtime`. The runtime
//! receives the blob and the candidate payload(s) as files. `--check`
//! deserializes the blob and evaluates nothing; `--init`/`--compare`
//! print `true` or `false` and exit 0 when the predicate evaluated.
//! Anything else — non-zero exit, unspawnable runtime, unparseable
//! verdict — is attributed to the user's predicate.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use gridcall_shared::GridcallResult;

/// What the predicate runtime reported for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateOutcome {
    /// The predicate evaluated to a boolean.
    Verdict(bool),
    /// The predicate (or its runtime) faulted; carries the diagnostic.
    Fault(String),
}

/// What the predicate runtime reported for a deserialization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateCheck {
    /// The blob deserialized into an invocable predicate.
    Loadable,
    /// The blob could not be deserialized; carries the diagnostic.
    Fault(String),
}

/// Handle to the predicate interpreter binary.
#[derive(Debug)]
pub struct PredicateRuntime {
    runtime_bin: PathBuf,
}

impl PredicateRuntime {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            runtime_bin: project_dir.join("bin/predicate_runtime"),
        }
    }

    /// Deserialize-check the predicate blob without evaluating it.
    pub async fn check(&self, predicate: &[u8]) -> GridcallResult<PredicateCheck> {
        match self.invoke("--check", predicate, &[]).await? {
            Ok(_) => Ok(PredicateCheck::Loadable),
            Err(message) => Ok(PredicateCheck::Fault(message)),
        }
    }

    /// Evaluate the unary predicate against one SUCCESS payload.
    pub async fn eval_init(
        &self,
        predicate: &[u8],
        payload: &[u8],
    ) -> GridcallResult<PredicateOutcome> {
        self.eval("--init", predicate, &[payload]).await
    }

    /// Evaluate the binary predicate against two SUCCESS payloads.
    pub async fn eval_compare(
        &self,
        predicate: &[u8],
        payload_1: &[u8],
        payload_2: &[u8],
    ) -> GridcallResult<PredicateOutcome> {
        self.eval("--compare", predicate, &[payload_1, payload_2])
            .await
    }

    async fn eval(
        &self,
        mode_flag: &str,
        predicate: &[u8],
        payloads: &[&[u8]],
    ) -> GridcallResult<PredicateOutcome> {
        let stdout = match self.invoke(mode_flag, predicate, payloads).await? {
            Ok(stdout) => stdout,
            Err(message) => return Ok(PredicateOutcome::Fault(message)),
        };

        match stdout.trim() {
            "true" => Ok(PredicateOutcome::Verdict(true)),
            "false" => Ok(PredicateOutcome::Verdict(false)),
            other => Ok(PredicateOutcome::Fault(format!(
                "predicate runtime returned non-boolean verdict: {other:?}"
            ))),
        }
    }

    /// Run the runtime once. `Ok(Ok(stdout))` on exit 0; `Ok(Err(_))`
    /// carries the fault diagnostic for a spawn failure or non-zero exit.
    async fn invoke(
        &self,
        mode_flag: &str,
        predicate: &[u8],
        payloads: &[&[u8]],
    ) -> GridcallResult<Result<String, String>> {
        // Scratch-file failures are ours, not the predicate's; they
        // propagate as internal errors (OTHER_ERROR at the process edge).
        let scratch = tempfile::tempdir()?;
        let predicate_path = scratch.path().join("predicate");
        tokio::fs::write(&predicate_path, predicate).await?;

        let mut payload_paths = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let path = scratch.path().join(format!("payload_{index}.json"));
            tokio::fs::write(&path, payload).await?;
            payload_paths.push(path);
        }

        debug!(runtime = %self.runtime_bin.display(), mode_flag, "Invoking predicate runtime");

        let output = match Command::new(&self.runtime_bin)
            .arg(mode_flag)
            .arg(&predicate_path)
            .args(&payload_paths)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return Ok(Err(format!(
                    "failed to spawn predicate runtime {}: {e}",
                    self.runtime_bin.display()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(Err(format!(
                "predicate runtime exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(Ok(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}
