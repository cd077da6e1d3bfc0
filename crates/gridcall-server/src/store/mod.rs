//! # Task Store
//!
//! Durable state for every task, backed by Postgres through sqlx. The
//! store is the sole authority on task existence and the only shared
//! mutable resource in the system; the gateway holds a pool sized by
//! `TASK_SERVICE_POOL_SIZE`, the one-shot daemons hold a pool of one.
//!
//! Writes commit per operation; the FINISHED transition is guarded so a
//! terminal record is never overwritten, which makes VCH-driven
//! re-invocation of the assimilator safe.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, error, info, warn};

use gridcall_shared::config::DatabaseConfig;
use gridcall_shared::proto::v1::{ResultStatus, TaskStatus};
use gridcall_shared::{GridcallError, GridcallResult, ValidationMode};

/// Schema migrations for the broker-owned `task_data` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn db_err(e: sqlx::Error) -> GridcallError {
    GridcallError::DatabaseError(e.to_string())
}

/// One row of `task_data`, as observed by the gateway's poll path.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TaskRecord {
    pub task_id: String,
    pub task_status: i32,
    pub result_status: Option<i32>,
    pub returned: Option<Vec<u8>>,
    pub error_message: Option<String>,
}

/// Handle to the shared relational store.
#[derive(Debug, Clone)]
pub struct TaskStore {
    pool: PgPool,
}

impl TaskStore {
    /// Connect with an explicit pool size. The gateway passes its worker
    /// pool size; the validator and assimilator pass 1.
    pub async fn connect(config: &DatabaseConfig, pool_size: u32) -> GridcallResult<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        info!(pool_size, "Connected task store pool");
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a fresh task in RUNNING state with its three opaque blobs.
    ///
    /// `task_id` is a fresh UUID, so a duplicate-key failure is evidence
    /// of corruption and surfaces as a database error like any other.
    pub async fn create_task(
        &self,
        task_id: &str,
        call_spec: &[u8],
        init_valid_func: &[u8],
        compare_valid_func: &[u8],
    ) -> GridcallResult<()> {
        sqlx::query(
            "INSERT INTO task_data \
             (task_id, call_spec, init_valid_func, compare_valid_func, task_status) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(task_id)
        .bind(call_spec)
        .bind(init_valid_func)
        .bind(compare_valid_func)
        .bind(TaskStatus::Running as i32)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        info!(task_id, "Created task");
        Ok(())
    }

    /// Monotonic transition to FINISHED.
    ///
    /// Returns `Ok(true)` when the row was transitioned, or when it had
    /// already reached FINISHED (the record is immutable, so a repeat
    /// invocation succeeds without writing). Returns `Ok(false)` when no
    /// such task exists.
    pub async fn set_task_finished(
        &self,
        task_id: &str,
        result_status: ResultStatus,
        returned: Option<&[u8]>,
        error_message: Option<&str>,
    ) -> GridcallResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query(
            "UPDATE task_data \
             SET task_status = $1, result_status = $2, returned = $3, error_message = $4 \
             WHERE task_id = $5 AND task_status = $6",
        )
        .bind(TaskStatus::Finished as i32)
        .bind(result_status as i32)
        .bind(returned)
        .bind(error_message)
        .bind(task_id)
        .bind(TaskStatus::Running as i32)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            let existing: Option<(i32,)> =
                sqlx::query_as("SELECT task_status FROM task_data WHERE task_id = $1")
                    .bind(task_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?;
            drop(tx);

            return match existing {
                Some((status,)) if status == TaskStatus::Finished as i32 => {
                    info!(task_id, "Task already finished, record left untouched");
                    Ok(true)
                }
                Some(_) => Err(GridcallError::Internal(format!(
                    "task {task_id} is RUNNING but the finish transition matched no row"
                ))),
                None => {
                    warn!(task_id, "No task found to finish");
                    Ok(false)
                }
            };
        }

        tx.commit().await.map_err(db_err)?;
        info!(
            task_id,
            result_status = result_status.as_str_name(),
            "Set task to FINISHED"
        );
        Ok(true)
    }

    /// Best-effort compensating write used by the gateway when VCH
    /// registration fails after the insert. Logs instead of propagating;
    /// the client also learns about the failure through the RPC error.
    pub async fn set_task_failed(&self, task_id: &str, error_message: &str) -> bool {
        match self
            .set_task_finished(task_id, ResultStatus::SystemError, None, Some(error_message))
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(task_id, "No task found while marking it failed");
                false
            }
            Err(e) => {
                error!(task_id, error = %e, "Failed to mark task as failed");
                false
            }
        }
    }

    /// Read the full task record; `None` when the task is unknown.
    pub async fn get_task_status(&self, task_id: &str) -> GridcallResult<Option<TaskRecord>> {
        let record = sqlx::query_as::<_, TaskRecord>(
            "SELECT task_id, task_status, result_status, returned, error_message \
             FROM task_data WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(task_id, found = record.is_some(), "Fetched task status");
        Ok(record)
    }

    /// Resolve the VCH workunit id to its name, which is the task id.
    pub async fn get_task_id_for_workunit(&self, wu_id: i64) -> GridcallResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM workunit WHERE id = $1")
            .bind(wu_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match &row {
            Some((task_id,)) => info!(wu_id, task_id, "Mapped workunit to task"),
            None => warn!(wu_id, "No workunit found"),
        }
        Ok(row.map(|(task_id,)| task_id))
    }

    /// Resolve a VCH result id to the owning task id through the
    /// `result.workunitid -> workunit.name` indirection. Both reads run in
    /// one transaction that is dropped without committing.
    pub async fn get_task_id_for_result(&self, result_id: i64) -> GridcallResult<String> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let wu_row: Option<(i64,)> = sqlx::query_as("SELECT workunitid FROM result WHERE id = $1")
            .bind(result_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let wu_id = wu_row
            .ok_or(GridcallError::ResultNotFound { result_id })?
            .0;

        let name_row: Option<(String,)> = sqlx::query_as("SELECT name FROM workunit WHERE id = $1")
            .bind(wu_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let task_id = name_row.ok_or(GridcallError::WorkunitNotFound { wu_id })?.0;

        info!(result_id, task_id, "Mapped result to task");
        Ok(task_id)
    }

    /// Fetch the predicate blob for the given validation mode.
    pub async fn get_validation_func(
        &self,
        task_id: &str,
        mode: ValidationMode,
    ) -> GridcallResult<Vec<u8>> {
        let query = match mode {
            ValidationMode::Init => "SELECT init_valid_func FROM task_data WHERE task_id = $1",
            ValidationMode::Compare => {
                "SELECT compare_valid_func FROM task_data WHERE task_id = $1"
            }
        };

        let row: Option<(Vec<u8>,)> = sqlx::query_as(query)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some((blob,)) if !blob.is_empty() => {
                debug!(task_id, mode = mode.as_str(), "Fetched validation function");
                Ok(blob)
            }
            _ => Err(GridcallError::ValidationFuncNotFound {
                task_id: task_id.to_string(),
                mode: mode.as_str(),
            }),
        }
    }
}
