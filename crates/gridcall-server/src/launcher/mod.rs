//! # Work Launcher
//!
//! Stages a task's call spec into the VCH project and registers the work
//! unit through the VCH's own `bin/stage_file` and `bin/create_work`
//! commands, both invoked with the project root as working directory.
//!
//! The launcher holds no state between calls beyond the staging
//! directory path; once `stage_file` succeeds the VCH owns the staged
//! copy and the file in the staging directory is scratch.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use gridcall_shared::proto::v1::RedundancyOptions;
use gridcall_shared::{GridcallError, GridcallResult};

/// Application-name prefix; the full VCH app name is `gridcall_<flavor>`.
pub const APP_PREFIX: &str = "gridcall";

const STAGING_DIR_NAME: &str = "gridcall_stage_tmp";
const WU_TEMPLATE: &str = "templates/gridcall/1.0/in";
const RESULT_TEMPLATE: &str = "templates/gridcall/1.0/out";

/// Drives VCH work registration for the gateway.
#[derive(Debug)]
pub struct WorkLauncher {
    project_dir: PathBuf,
    staging_dir: PathBuf,
}

impl WorkLauncher {
    /// Create the launcher and its staging directory under the VCH
    /// project root.
    pub fn new(project_dir: impl Into<PathBuf>) -> GridcallResult<Self> {
        let project_dir = project_dir.into();
        let staging_dir = project_dir.join(STAGING_DIR_NAME);
        std::fs::create_dir_all(&staging_dir)?;
        Ok(Self {
            project_dir,
            staging_dir,
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Stage the call spec and create the VCH work unit named `task_id`.
    ///
    /// Any non-zero exit or spawn failure surfaces as a `LaunchError`
    /// whose message composes the command's exit status, stdout, and
    /// stderr; the gateway forwards that message to the client and into
    /// the compensating SYSTEM_ERROR write.
    pub async fn create_work(
        &self,
        task_id: &str,
        flavor: &str,
        call_spec: &[u8],
        redundancy: &RedundancyOptions,
    ) -> GridcallResult<()> {
        let file_name = format!("wu_{task_id}_call_spec");
        let tmp_path = self.staging_dir.join(&file_name);
        tokio::fs::write(&tmp_path, call_spec).await?;

        self.run_command(
            "bin/stage_file",
            &[tmp_path.to_string_lossy().into_owned()],
            "Failed to stage file",
        )
        .await?;

        let appname = format!("{APP_PREFIX}_{flavor}");
        let args = vec![
            "--appname".to_string(),
            appname,
            "--min_quorum".to_string(),
            redundancy.min_quorum.to_string(),
            "--target_nresults".to_string(),
            redundancy.target_nresults.to_string(),
            "--max_error_results".to_string(),
            redundancy.max_error_results.to_string(),
            "--max_total_results".to_string(),
            redundancy.max_total_results.to_string(),
            "--max_success_results".to_string(),
            redundancy.max_success_results.to_string(),
            "--delay_bound".to_string(),
            redundancy.delay_bound.to_string(),
            "--wu_name".to_string(),
            task_id.to_string(),
            "--wu_template".to_string(),
            WU_TEMPLATE.to_string(),
            "--result_template".to_string(),
            RESULT_TEMPLATE.to_string(),
            // The staged file is referenced by name, not path.
            file_name,
        ];
        self.run_command("bin/create_work", &args, "Failed to create work")
            .await?;

        info!(task_id, flavor, "Registered work unit with the VCH");
        Ok(())
    }

    async fn run_command(
        &self,
        program: &str,
        args: &[String],
        error_prefix: &str,
    ) -> GridcallResult<()> {
        debug!(program, ?args, "Running VCH command");

        // Resolve against the project root explicitly; relative program
        // paths combined with current_dir are platform-ambiguous.
        let output = Command::new(self.project_dir.join(program))
            .args(args)
            .current_dir(&self.project_dir)
            .output()
            .await
            .map_err(|e| GridcallError::launch_error(format!("{error_prefix}: {e}")))?;

        if !output.status.success() {
            let mut message = format!("{error_prefix}: {program} exited with {}", output.status);
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                message.push_str(&format!("\nStdout: {}", stdout.trim()));
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                message.push_str(&format!("\nStderr: {}", stderr.trim()));
            }
            return Err(GridcallError::launch_error(message));
        }

        debug!(program, "VCH command finished");
        Ok(())
    }
}
